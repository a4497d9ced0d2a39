//! Demo routing server: travel times, route ordering, address checks.
//!
//! Travel estimates are derived deterministically from the address pair so
//! tests and demos get stable numbers without a distance-matrix backend.

use std::sync::Arc;

use async_trait::async_trait;
use flathunt_core::{
    Arguments, HandlerError, ParamSpec, ParamType, RegistrationError, ServerName, ToolHandler,
    ToolName, ToolSchema, ToolSpec,
};
use serde_json::{Value, json};

use crate::server::ToolServer;

fn pair_hash(origin: &str, destination: &str) -> u64 {
    let mut acc: u64 = 0xcbf29ce484222325;
    for byte in origin.bytes().chain([0u8]).chain(destination.bytes()) {
        acc ^= byte as u64;
        acc = acc.wrapping_mul(0x100000001b3);
    }
    acc
}

/// Deterministic travel-time estimate in minutes, 8..=45.
fn travel_minutes(origin: &str, destination: &str) -> i64 {
    if origin == destination {
        return 0;
    }
    8 + (pair_hash(origin, destination) % 38) as i64
}

struct CalculateTravelTime;

#[async_trait]
impl ToolHandler for CalculateTravelTime {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let origin = args
            .str_arg("origin")
            .ok_or_else(|| HandlerError::failed("origin is required"))?;
        let destination = args
            .str_arg("destination")
            .ok_or_else(|| HandlerError::failed("destination is required"))?;

        let minutes = travel_minutes(origin, destination);
        Ok(json!({
            "origin": origin,
            "destination": destination,
            "travel_time_minutes": minutes,
            "distance_km": (minutes as f64 * 0.7 * 10.0).round() / 10.0,
        }))
    }
}

struct OptimizeViewingRoute;

#[async_trait]
impl ToolHandler for OptimizeViewingRoute {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let addresses = args
            .array_arg("addresses")
            .ok_or_else(|| HandlerError::failed("addresses is required"))?;
        let mut remaining: Vec<String> = addresses
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| HandlerError::failed("addresses entries must be strings"))
            })
            .collect::<Result<_, _>>()?;
        if remaining.is_empty() {
            return Err(HandlerError::failed("addresses must not be empty"));
        }

        let start = args
            .str_arg("start_location")
            .unwrap_or("Downtown")
            .to_string();

        // Greedy nearest-neighbor over the deterministic estimates.
        let mut current = start.clone();
        let mut stops = Vec::with_capacity(remaining.len());
        let mut total_minutes = 0i64;
        while !remaining.is_empty() {
            let Some((idx, leg)) = remaining
                .iter()
                .enumerate()
                .map(|(i, addr)| (i, travel_minutes(&current, addr)))
                .min_by_key(|&(_, leg)| leg)
            else {
                break;
            };
            let next = remaining.remove(idx);
            total_minutes += leg;
            stops.push(json!({
                "address": next.clone(),
                "leg_minutes": leg,
                "cumulative_minutes": total_minutes,
            }));
            current = next;
        }

        let stop_count = stops.len();
        Ok(json!({
            "start_location": start,
            "ordered_stops": stops,
            "stop_count": stop_count,
            "total_travel_minutes": total_minutes,
        }))
    }
}

struct ValidateAddress;

#[async_trait]
impl ToolHandler for ValidateAddress {
    async fn handle(&self, args: Arguments) -> Result<Value, HandlerError> {
        let address = args
            .str_arg("address")
            .ok_or_else(|| HandlerError::failed("address is required"))?;

        let trimmed = address.trim();
        let has_number = trimmed.chars().any(|c| c.is_ascii_digit());
        let has_locality = trimmed.contains(',');
        let valid = !trimmed.is_empty() && has_number && has_locality;

        Ok(json!({
            "input": address,
            "formatted_address": trimmed,
            "valid": valid,
            "issues": if valid {
                Vec::<&str>::new()
            } else {
                let mut issues = Vec::new();
                if trimmed.is_empty() {
                    issues.push("empty address");
                }
                if !has_number {
                    issues.push("missing street number");
                }
                if !has_locality {
                    issues.push("missing locality");
                }
                issues
            },
        }))
    }
}

/// The demo routing server: travel estimates and route optimization.
pub fn routing_server() -> Result<ToolServer, RegistrationError> {
    ToolServer::builder(ServerName::parse("routing").expect("static name"))
        .capability("routing")
        .capability("geocoding")
        .tool(ToolSpec::new(
            ToolName::parse("calculate_travel_time").expect("static name"),
            "Estimate travel time between two addresses",
            ToolSchema::new()
                .with(ParamSpec::required("origin", ParamType::String))
                .with(ParamSpec::required("destination", ParamType::String)),
            Arc::new(CalculateTravelTime),
        ))
        .tool(ToolSpec::new(
            ToolName::parse("optimize_viewing_route").expect("static name"),
            "Order viewing addresses to minimize total travel time",
            ToolSchema::new()
                .with(
                    ParamSpec::required("addresses", ParamType::Array)
                        .describe("Property addresses to visit"),
                )
                .with(
                    ParamSpec::optional("start_location", ParamType::String)
                        .describe("Where the viewing day starts"),
                ),
            Arc::new(OptimizeViewingRoute),
        ))
        .tool(ToolSpec::new(
            ToolName::parse("validate_address").expect("static name"),
            "Sanity-check and normalize a street address",
            ToolSchema::new().with(ParamSpec::required("address", ParamType::String)),
            Arc::new(ValidateAddress),
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn travel_time_is_deterministic_and_bounded() {
        let args = Arguments::new()
            .with("origin", "Downtown Austin, TX")
            .with("destination", "University of Texas at Austin");
        let a = CalculateTravelTime.handle(args.clone()).await.unwrap();
        let b = CalculateTravelTime.handle(args).await.unwrap();
        assert_eq!(a["travel_time_minutes"], b["travel_time_minutes"]);
        let minutes = a["travel_time_minutes"].as_i64().unwrap();
        assert!((8..=45).contains(&minutes));
    }

    #[tokio::test]
    async fn same_origin_and_destination_is_zero() {
        let out = CalculateTravelTime
            .handle(Arguments::new().with("origin", "A").with("destination", "A"))
            .await
            .unwrap();
        assert_eq!(out["travel_time_minutes"], 0);
    }

    #[tokio::test]
    async fn route_visits_every_address_once() {
        let out = OptimizeViewingRoute
            .handle(
                Arguments::new()
                    .with("addresses", json!(["A St, Austin", "B Ave, Austin", "C Blvd, Austin"]))
                    .with("start_location", "Downtown Austin"),
            )
            .await
            .unwrap();

        assert_eq!(out["stop_count"], 3);
        let stops = out["ordered_stops"].as_array().unwrap();
        let mut seen: Vec<&str> = stops.iter().map(|s| s["address"].as_str().unwrap()).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!["A St, Austin", "B Ave, Austin", "C Blvd, Austin"]);

        // Cumulative minutes are monotonically non-decreasing.
        let cumulative: Vec<i64> = stops
            .iter()
            .map(|s| s["cumulative_minutes"].as_i64().unwrap())
            .collect();
        assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(
            out["total_travel_minutes"].as_i64().unwrap(),
            *cumulative.last().unwrap()
        );
    }

    #[tokio::test]
    async fn empty_route_rejected() {
        let err = OptimizeViewingRoute
            .handle(Arguments::new().with("addresses", json!([])))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[tokio::test]
    async fn address_validation_flags_issues() {
        let ok = ValidateAddress
            .handle(Arguments::new().with("address", "  2505 San Gabriel St, Austin, TX "))
            .await
            .unwrap();
        assert_eq!(ok["valid"], true);
        assert_eq!(ok["formatted_address"], "2505 San Gabriel St, Austin, TX");

        let bad = ValidateAddress
            .handle(Arguments::new().with("address", "somewhere"))
            .await
            .unwrap();
        assert_eq!(bad["valid"], false);
        let issues = bad["issues"].as_array().unwrap();
        assert_eq!(issues.len(), 2);
    }
}
