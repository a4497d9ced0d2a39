//! Demo scheduling server: availability lookup and viewing-event creation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use flathunt_core::{
    Arguments, HandlerError, ParamSpec, ParamType, RegistrationError, ServerName, ToolHandler,
    ToolName, ToolSchema, ToolSpec,
};
use serde_json::{Value, json};

use crate::server::ToolServer;

const DEFAULT_SLOT_MINUTES: i64 = 90;

// Viewing slots offered on each day: 10 AM, 2 PM, 4 PM.
const DAILY_SLOT_HOURS: [u32; 3] = [10, 14, 16];

// A single availability query never returns more slots than this.
const MAX_AVAILABILITY_SLOTS: usize = 10;

fn parse_date(args: &Arguments, name: &str) -> Result<NaiveDate, HandlerError> {
    let raw = args
        .str_arg(name)
        .ok_or_else(|| HandlerError::failed(format!("{name} is required")))?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| HandlerError::failed(format!("{name} must be YYYY-MM-DD: {e}")))
}

struct GetAvailability;

#[async_trait]
impl ToolHandler for GetAvailability {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let start = parse_date(&args, "start_date")?;
        let end = parse_date(&args, "end_date")?;
        if end < start {
            return Err(HandlerError::failed("end_date precedes start_date"));
        }
        let duration = args.i64_arg("duration_minutes").unwrap_or(DEFAULT_SLOT_MINUTES);

        let mut slots = Vec::new();
        let mut day = start;
        'days: while day <= end {
            for hour in DAILY_SLOT_HOURS {
                if slots.len() == MAX_AVAILABILITY_SLOTS {
                    break 'days;
                }
                let slot_time = NaiveTime::from_hms_opt(hour, 0, 0)
                    .ok_or_else(|| HandlerError::failed("invalid slot time"))?;
                let slot_start = day.and_time(slot_time);
                let slot_end = slot_start + ChronoDuration::minutes(duration);
                slots.push(json!({
                    "start": slot_start.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    "end": slot_end.format("%Y-%m-%dT%H:%M:%S").to_string(),
                    "duration_minutes": duration,
                }));
            }
            day += ChronoDuration::days(1);
        }

        Ok(json!({
            "availability_slots": slots,
            "slot_count": slots.len(),
        }))
    }
}

struct CreateViewingEvent;

#[async_trait]
impl ToolHandler for CreateViewingEvent {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let property = args
            .object_arg("property")
            .ok_or_else(|| HandlerError::failed("property is required"))?;
        let viewing_time = args
            .object_arg("viewing_time")
            .ok_or_else(|| HandlerError::failed("viewing_time is required"))?;

        let address = property
            .get("address")
            .and_then(Value::as_str)
            .unwrap_or("unknown address");
        let start = viewing_time
            .get("start")
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::failed("viewing_time.start is required"))?;

        let attendees = args
            .array_arg("attendees")
            .cloned()
            .unwrap_or_default();

        Ok(json!({
            "event_id": format!("viewing-{:08x}", fingerprint(&[address, start])),
            "summary": format!("Apartment viewing: {address}"),
            "start": start,
            "end": viewing_time.get("end"),
            "attendees": attendees,
            "status": "confirmed",
        }))
    }
}

struct BulkCreateViewingEvents;

#[async_trait]
impl ToolHandler for BulkCreateViewingEvents {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let schedule = args
            .array_arg("viewing_schedule")
            .ok_or_else(|| HandlerError::failed("viewing_schedule is required"))?;

        let inner = CreateViewingEvent;
        let mut created = Vec::with_capacity(schedule.len());
        for entry in schedule {
            let entry_args = match entry {
                Value::Object(map) => Arguments::from(map.clone()),
                _ => return Err(HandlerError::failed("viewing_schedule entries must be objects")),
            };
            created.push(inner.handle(entry_args).await?);
        }

        let event_count = created.len();
        Ok(json!({
            "created_events": created,
            "event_count": event_count,
        }))
    }
}

// Stable id source for demo events; not cryptographic.
fn fingerprint(parts: &[&str]) -> u32 {
    let mut acc: u32 = 2166136261;
    for part in parts {
        for byte in part.bytes() {
            acc ^= byte as u32;
            acc = acc.wrapping_mul(16777619);
        }
    }
    acc
}

/// The demo scheduling server: calendar availability and viewing events.
pub fn scheduling_server() -> Result<ToolServer, RegistrationError> {
    ToolServer::builder(ServerName::parse("scheduling").expect("static name"))
        .capability("scheduling")
        .capability("calendar_read")
        .capability("calendar_write")
        .tool(ToolSpec::new(
            ToolName::parse("get_availability").expect("static name"),
            "Check calendar availability for apartment viewing scheduling",
            ToolSchema::new()
                .with(
                    ParamSpec::required("start_date", ParamType::String)
                        .describe("Start date in YYYY-MM-DD format"),
                )
                .with(
                    ParamSpec::required("end_date", ParamType::String)
                        .describe("End date in YYYY-MM-DD format"),
                )
                .with(
                    ParamSpec::optional("duration_minutes", ParamType::Integer)
                        .describe("Duration of each viewing slot in minutes"),
                ),
            Arc::new(GetAvailability),
        ))
        .tool(ToolSpec::new(
            ToolName::parse("create_viewing_event").expect("static name"),
            "Create an apartment viewing calendar event with property details",
            ToolSchema::new()
                .with(
                    ParamSpec::required("property", ParamType::Object)
                        .describe("Property information including address and agent details"),
                )
                .with(
                    ParamSpec::required("viewing_time", ParamType::Object)
                        .describe("Viewing slot with start and end times"),
                )
                .with(
                    ParamSpec::optional("attendees", ParamType::Array)
                        .describe("Attendee email addresses"),
                ),
            Arc::new(CreateViewingEvent),
        ))
        .tool(ToolSpec::new(
            ToolName::parse("create_bulk_viewing_events").expect("static name"),
            "Create calendar events for an entire viewing schedule",
            ToolSchema::new().with(
                ParamSpec::required("viewing_schedule", ParamType::Array)
                    .describe("List of property/viewing_time pairs"),
            ),
            Arc::new(BulkCreateViewingEvents),
        ))
        .build()
}
