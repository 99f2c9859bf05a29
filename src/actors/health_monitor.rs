use actix::prelude::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::core::{ComponentHealth, HealthStatus};
use crate::metrics::Metrics;
use crate::store::OrderStore;

// ============================================================================
// Health Monitor Actor - Monitors system health
// ============================================================================
//
// Responsibilities:
// - Periodically ping the order store
// - Track health status of all components
// - Feed the database health gauge
// - Aggregate system-wide health for the /health endpoint
//
// ============================================================================

pub const DATABASE_COMPONENT: &str = "database";

/// A ping slower than this marks the database as degraded.
const SLOW_PING: Duration = Duration::from_millis(500);

// ============================================================================
// Messages
// ============================================================================

#[derive(Message)]
#[rtype(result = "()")]
pub struct UpdateHealth {
    pub component: String,
    pub status: HealthStatus,
    pub details: Option<String>,
}

#[derive(Message)]
#[rtype(result = "SystemHealth")]
pub struct GetSystemHealth;

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub overall_status: HealthStatus,
    pub components: HashMap<String, ComponentHealth>,
    pub check_time: DateTime<Utc>,
}

// ============================================================================
// Health Monitor Actor
// ============================================================================

pub struct HealthMonitorActor {
    components: HashMap<String, ComponentHealth>,
    store: Arc<dyn OrderStore>,
    metrics: Arc<Metrics>,
    interval: Duration,
}

impl HealthMonitorActor {
    pub fn new(store: Arc<dyn OrderStore>, metrics: Arc<Metrics>, interval: Duration) -> Self {
        Self {
            components: HashMap::new(),
            store,
            metrics,
            interval,
        }
    }

    fn compute_overall_status(&self) -> HealthStatus {
        let mut has_degraded = false;
        let mut unhealthy_components = Vec::new();

        for (name, health) in &self.components {
            match &health.status {
                HealthStatus::Unhealthy(msg) => {
                    unhealthy_components.push(format!("{}: {}", name, msg));
                }
                HealthStatus::Degraded(_) => {
                    has_degraded = true;
                }
                HealthStatus::Healthy => {}
            }
        }

        if !unhealthy_components.is_empty() {
            unhealthy_components.sort();
            HealthStatus::Unhealthy(unhealthy_components.join(", "))
        } else if has_degraded {
            HealthStatus::Degraded("Some components degraded".to_string())
        } else {
            HealthStatus::Healthy
        }
    }

    fn probe_database(&self, addr: Addr<Self>) {
        let store = self.store.clone();

        actix::spawn(async move {
            let started = Instant::now();
            let (status, details) = match store.ping().await {
                Ok(()) if started.elapsed() > SLOW_PING => (
                    HealthStatus::Degraded("Slow ping".to_string()),
                    Some(format!("ping took {:?}", started.elapsed())),
                ),
                Ok(()) => (HealthStatus::Healthy, None),
                Err(e) => (HealthStatus::Unhealthy(e.to_string()), None),
            };

            addr.do_send(UpdateHealth {
                component: DATABASE_COMPONENT.to_string(),
                status,
                details,
            });
        });
    }
}

impl Actor for HealthMonitorActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(interval = ?self.interval, "HealthMonitorActor started");

        let addr = ctx.address();
        self.probe_database(addr.clone());

        ctx.run_interval(self.interval, move |act, _ctx| {
            act.probe_database(addr.clone());
        });
    }
}

impl Handler<UpdateHealth> for HealthMonitorActor {
    type Result = ();

    fn handle(&mut self, msg: UpdateHealth, _: &mut Self::Context) {
        let previous = self
            .components
            .get(&msg.component)
            .map(|health| health.status.clone());

        if previous.as_ref() != Some(&msg.status) {
            if msg.status.is_healthy() {
                tracing::info!(component = %msg.component, "Component healthy");
            } else {
                tracing::warn!(component = %msg.component, status = ?msg.status, "Component health changed");
            }
        } else {
            tracing::debug!(component = %msg.component, status = ?msg.status, "Updated component health");
        }

        if msg.component == DATABASE_COMPONENT {
            self.metrics.set_database_health(msg.status.gauge_level());
        }

        let health = ComponentHealth::new(msg.component.clone(), msg.status).with_details(msg.details);
        self.components.insert(msg.component, health);
    }
}

impl Handler<GetSystemHealth> for HealthMonitorActor {
    type Result = MessageResult<GetSystemHealth>;

    fn handle(&mut self, _msg: GetSystemHealth, _: &mut Self::Context) -> Self::Result {
        let overall_status = self.compute_overall_status();

        MessageResult(SystemHealth {
            overall_status,
            components: self.components.clone(),
            check_time: Utc::now(),
        })
    }
}
