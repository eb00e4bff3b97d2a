#![allow(dead_code)]

use std::sync::Arc;

use tally_core::{MemoryLogger, Outcome, Plan, Signal};

/// Routes engine diagnostics to the test harness output.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Helper function to create a plan recording into a memory logger
pub fn create_test_plan(name: &str) -> (Arc<MemoryLogger>, Plan) {
    init_logging();
    let logger = Arc::new(MemoryLogger::new());
    let plan = Plan::new(name).with_logger(logger.clone());
    (logger, plan)
}

/// Schedules `plan` on a fresh head signal, releases it and waits for the
/// plan to finish.
pub async fn run_to_completion(plan: &Plan) -> Outcome {
    let (head, signal) = Signal::pending();
    let tail = plan
        .schedule(&signal, None)
        .expect("Failed to schedule plan");
    head.resolve();
    tail.wait().await
}
