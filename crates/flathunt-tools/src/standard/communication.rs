//! Demo messaging server: email delivery and agent outreach.
//!
//! Sending an email is the canonical non-idempotent tool operation, so
//! every payload here carries `"idempotent": false`; callers deciding on
//! retries can read it straight off the result.

use std::sync::Arc;

use async_trait::async_trait;
use flathunt_core::{
    Arguments, HandlerError, ParamSpec, ParamType, RegistrationError, ServerName, ToolHandler,
    ToolName, ToolSchema, ToolSpec,
};
use serde_json::{Value, json};

use crate::server::ToolServer;

fn require_str<'a>(args: &'a Arguments, name: &str) -> Result<&'a str, HandlerError> {
    args.str_arg(name)
        .ok_or_else(|| HandlerError::failed(format!("{name} is required")))
}

fn looks_like_email(addr: &str) -> bool {
    match addr.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

fn message_id(to: &str, subject: &str) -> String {
    let mut acc: u64 = 0xcbf29ce484222325;
    for byte in to.bytes().chain(subject.bytes()) {
        acc ^= byte as u64;
        acc = acc.wrapping_mul(0x100000001b3);
    }
    format!("msg-{acc:016x}")
}

struct SendEmail;

#[async_trait]
impl ToolHandler for SendEmail {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let to = require_str(&args, "to_email")?;
        let subject = require_str(&args, "subject")?;
        let message = require_str(&args, "message")?;

        if !looks_like_email(to) {
            return Err(HandlerError::failed(format!("invalid recipient address: {to}")));
        }

        Ok(json!({
            "status": "sent",
            "message_id": message_id(to, subject),
            "to": to,
            "subject": subject,
            "body_length": message.len(),
            "idempotent": false,
        }))
    }
}

struct SendCoordinationEmail;

#[async_trait]
impl ToolHandler for SendCoordinationEmail {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let profile = args
            .object_arg("user_profile")
            .ok_or_else(|| HandlerError::failed("user_profile is required"))?;
        let schedule = args
            .array_arg("viewing_schedule")
            .ok_or_else(|| HandlerError::failed("viewing_schedule is required"))?;

        let to = profile
            .get("email")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::failed("user_profile.email is required"))?;
        let name = profile.get("name").and_then(Value::as_str).unwrap_or("there");

        let mut lines = vec![format!("Hi {name},"), String::new()];
        lines.push(format!("Your {} apartment viewings are booked:", schedule.len()));
        for entry in schedule {
            let address = entry
                .get("property")
                .and_then(|p| p.get("address"))
                .and_then(Value::as_str)
                .unwrap_or("unknown address");
            let start = entry
                .get("viewing_time")
                .and_then(|t| t.get("start"))
                .and_then(Value::as_str)
                .unwrap_or("TBD");
            lines.push(format!("  - {address} at {start}"));
        }
        if let Some(insights) = args.object_arg("insights") {
            if let Some(summary) = insights.get("summary").and_then(Value::as_str) {
                lines.push(String::new());
                lines.push(format!("Notes: {summary}"));
            }
        }
        let body = lines.join("\n");
        let subject = format!("Your apartment viewing schedule ({} stops)", schedule.len());

        Ok(json!({
            "status": "sent",
            "message_id": message_id(to, &subject),
            "to": to,
            "subject": subject,
            "body": body,
            "idempotent": false,
        }))
    }
}

struct ContactPropertyAgent;

#[async_trait]
impl ToolHandler for ContactPropertyAgent {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let contact = args
            .object_arg("agent_contact")
            .ok_or_else(|| HandlerError::failed("agent_contact is required"))?;
        let property = args
            .object_arg("property")
            .ok_or_else(|| HandlerError::failed("property is required"))?;
        let viewing_time = require_str(&args, "viewing_time")?;

        let email = contact
            .get("email")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::failed("agent_contact.email is required"))?;
        let address = property
            .get("address")
            .and_then(Value::as_str)
            .unwrap_or("the listed property");

        let subject = format!("Viewing request: {address}");
        Ok(json!({
            "status": "sent",
            "message_id": message_id(email, &subject),
            "to": email,
            "subject": subject,
            "requested_time": viewing_time,
            "idempotent": false,
        }))
    }
}

/// The demo messaging server: email and agent-outreach tools.
pub fn messaging_server() -> Result<ToolServer, RegistrationError> {
    ToolServer::builder(ServerName::parse("messaging").expect("static name"))
        .capability("messaging")
        .capability("email_delivery")
        .tool(ToolSpec::new(
            ToolName::parse("send_email").expect("static name"),
            "Send a plain email to a single recipient",
            ToolSchema::new()
                .with(ParamSpec::required("to_email", ParamType::String).describe("Recipient address"))
                .with(ParamSpec::required("subject", ParamType::String))
                .with(ParamSpec::required("message", ParamType::String)),
            Arc::new(SendEmail),
        ))
        .tool(ToolSpec::new(
            ToolName::parse("send_coordination_email").expect("static name"),
            "Send the user a summary email for a coordinated viewing schedule",
            ToolSchema::new()
                .with(
                    ParamSpec::required("user_profile", ParamType::Object)
                        .describe("User profile with name and email"),
                )
                .with(
                    ParamSpec::required("viewing_schedule", ParamType::Array)
                        .describe("Booked viewings with property and viewing_time"),
                )
                .with(
                    ParamSpec::optional("insights", ParamType::Object)
                        .describe("Optional multi-agent insights to include"),
                ),
            Arc::new(SendCoordinationEmail),
        ))
        .tool(ToolSpec::new(
            ToolName::parse("contact_property_agent").expect("static name"),
            "Request a viewing slot from a property's listing agent",
            ToolSchema::new()
                .with(ParamSpec::required("agent_contact", ParamType::Object))
                .with(ParamSpec::required("property", ParamType::Object))
                .with(
                    ParamSpec::required("viewing_time", ParamType::String)
                        .describe("Requested slot, ISO 8601"),
                ),
            Arc::new(ContactPropertyAgent),
        ))
        .build()
}
