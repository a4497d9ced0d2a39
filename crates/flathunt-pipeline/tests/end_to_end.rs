//! Full-path test: tool servers behind the dispatcher, agents handing
//! artifacts through the store, the orchestrator enforcing the contract.

use std::sync::Arc;
use std::time::Duration;

use flathunt_core::{
    AgentId, Arguments, InvocationRequest, InvocationStatus, ParamSpec, ParamType, ServerName,
    StoreKey, ToolName, ToolSchema, ToolSpec,
};
use flathunt_pipeline::{Orchestrator, RunState, StageContext, StageRunner, StageSpec};
use flathunt_store::{CoordinationStore, NamespacedStore};
use flathunt_tools::{Dispatcher, ToolRegistry, ToolServer};
use serde_json::{Value, json};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}

fn scheduling_dispatcher() -> Dispatcher {
    let create_event = ToolSpec::new(
        ToolName::parse("create_event").expect("static name"),
        "Book a viewing at a property",
        ToolSchema::new()
            .with(ParamSpec::required("start_time", ParamType::String))
            .with(ParamSpec::optional("address", ParamType::String)),
        Arc::new(|args: Arguments| async move {
            let start_time = args
                .str_arg("start_time")
                .map(str::to_string)
                .unwrap_or_default();
            let address = args.str_arg("address").unwrap_or("unknown").to_string();
            Ok(json!({
                "event_id": format!("evt-{}", start_time.replace(':', "")),
                "start_time": start_time,
                "address": address,
                "status": "confirmed",
            }))
        }),
    );

    let server = ToolServer::builder(ServerName::parse("scheduling").expect("static name"))
        .capability("scheduling")
        .tool(create_event)
        .build()
        .expect("unique tool names");

    let mut builder = ToolRegistry::builder();
    builder.register(server).expect("fresh registry");
    Dispatcher::new(Arc::new(builder.build()))
}

fn request(tool: &str, arguments: Arguments) -> InvocationRequest {
    InvocationRequest::new(
        ToolName::parse(tool).unwrap(),
        arguments,
        AgentId::parse("agent-3").unwrap(),
    )
}

#[tokio::test]
async fn missing_start_time_is_rejected_before_the_handler() {
    init_tracing();
    let dispatcher = scheduling_dispatcher();

    let result = dispatcher
        .invoke(request("create_event", Arguments::new()), Duration::from_secs(1))
        .await;

    assert_eq!(result.status, InvocationStatus::ValidationError);
    assert!(result.payload.is_none());
    assert!(
        result.error_detail.as_deref().unwrap().contains("start_time"),
        "detail: {:?}",
        result.error_detail
    );
}

#[tokio::test]
async fn valid_create_event_echoes_the_booking() {
    init_tracing();
    let dispatcher = scheduling_dispatcher();

    let result = dispatcher
        .invoke(
            request(
                "create_event",
                Arguments::new()
                    .with("start_time", "2026-09-01T10:00:00")
                    .with("address", "401 W 5th St, Austin, TX"),
            ),
            Duration::from_secs(1),
        )
        .await;

    assert_eq!(result.status, InvocationStatus::Success);
    let payload = result.payload.unwrap();
    assert_eq!(payload["status"], "confirmed");
    assert_eq!(payload["address"], "401 W 5th St, Austin, TX");
    assert_eq!(payload["start_time"], "2026-09-01T10:00:00");
}

#[tokio::test]
async fn pipeline_books_viewings_for_discovered_candidates() {
    init_tracing();
    let store = Arc::new(CoordinationStore::new());
    let orchestrator = Orchestrator::new(Arc::clone(&store));
    let dispatcher = scheduling_dispatcher();

    let candidates_key = StoreKey::parse("agent1.candidates").unwrap();
    let schedule_key = StoreKey::parse("viewing_schedule").unwrap();

    let search = StageSpec::builder("search", AgentId::parse("agent-1").unwrap())
        .output(candidates_key.clone())
        .deadline(Duration::from_secs(2))
        .build();
    let coordinate = StageSpec::builder("coordinate", AgentId::parse("agent-3").unwrap())
        .input(candidates_key.clone())
        .output(schedule_key.clone())
        .deadline(Duration::from_secs(2))
        .build();

    let search_runner: Arc<dyn StageRunner> = Arc::new(|ctx: StageContext| async move {
        ctx.store()
            .write(
                &StoreKey::parse("agent1.candidates").unwrap(),
                ctx.agent(),
                json!(["401 W 5th St, Austin, TX", "2505 San Gabriel St, Austin, TX"]),
            )
            .map_err(|e| flathunt_core::HandlerError::failed(e.to_string()))?;
        Ok(())
    });

    let coordinate_runner: Arc<dyn StageRunner> = {
        let dispatcher = dispatcher.clone();
        Arc::new(move |ctx: StageContext| {
            let dispatcher = dispatcher.clone();
            async move {
                let candidates = ctx
                    .input(&StoreKey::parse("agent1.candidates").unwrap())
                    .ok_or_else(|| flathunt_core::HandlerError::failed("no candidates"))?
                    .value
                    .clone();

                let mut bookings = Vec::new();
                for (i, address) in candidates.as_array().into_iter().flatten().enumerate() {
                    let result = dispatcher
                        .invoke(
                            InvocationRequest::new(
                                ToolName::parse("create_event").unwrap(),
                                Arguments::new()
                                    .with("start_time", format!("2026-09-01T1{i}:00:00"))
                                    .with("address", address.clone()),
                                ctx.agent().clone(),
                            ),
                            Duration::from_secs(1),
                        )
                        .await;
                    if !result.is_success() {
                        return Err(flathunt_core::HandlerError::failed(
                            result.error_detail.unwrap_or_default(),
                        ));
                    }
                    bookings.push(result.payload.unwrap_or(Value::Null));
                }

                ctx.store()
                    .write(
                        &StoreKey::parse("viewing_schedule").unwrap(),
                        ctx.agent(),
                        json!({ "bookings": bookings }),
                    )
                    .map_err(|e| flathunt_core::HandlerError::failed(e.to_string()))?;
                Ok(())
            }
        })
    };

    let report = orchestrator
        .run(vec![(search, search_runner), (coordinate, coordinate_runner)])
        .await;

    assert!(
        matches!(report.state, RunState::Complete),
        "state: {:?}",
        report.state
    );

    let scoped = NamespacedStore::new(store, report.run_id);
    let schedule = scoped.read(&schedule_key).unwrap().unwrap();
    let bookings = schedule.value["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 2);
    assert!(bookings.iter().all(|b| b["status"] == "confirmed"));
}
