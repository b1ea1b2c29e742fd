use std::{
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use drover_core::{
    EngineError, ExecuteContext, JobTrigger, MapState, Provider, ProviderError, RegisterContext,
    StateObject,
};
use drover_model::RawProperties;

pub const TICKER: &str = "ticker";

/// Unit of the `Interval` property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Period {
    Millisecond,
    #[default]
    Second,
    Minute,
    Hour,
    Day,
}

impl FromStr for Period {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Millisecond" => Ok(Period::Millisecond),
            "Second" => Ok(Period::Second),
            "Minute" => Ok(Period::Minute),
            "Hour" => Ok(Period::Hour),
            "Day" => Ok(Period::Day),
            other => Err(ProviderError::InvalidSettings(format!(
                "unknown Period {other:?} on ticker"
            ))),
        }
    }
}

impl Period {
    pub fn unit(self) -> Duration {
        match self {
            Period::Millisecond => Duration::from_millis(1),
            Period::Second => Duration::from_secs(1),
            Period::Minute => Duration::from_secs(60),
            Period::Hour => Duration::from_secs(60 * 60),
            Period::Day => Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TickerSettings {
    #[serde(rename = "Interval", default)]
    interval: String,
    #[serde(rename = "Period", default)]
    period: Option<String>,
}

/// Parse `Interval` and `Period` into the tick period.
fn tick_period(props: &RawProperties) -> Result<Duration, ProviderError> {
    let settings: TickerSettings = props.decode()?;

    let interval: u32 = settings.interval.trim().parse().map_err(|_| {
        ProviderError::InvalidSettings(format!(
            "Interval must be a positive integer on ticker, got {:?}",
            settings.interval
        ))
    })?;
    if interval == 0 {
        return Err(ProviderError::InvalidSettings(
            "Interval must be set on ticker".into(),
        ));
    }

    let period = match settings.period.as_deref().map(str::trim) {
        None | Some("") => Period::default(),
        Some(name) => name.parse()?,
    };
    Ok(period.unit() * interval)
}

#[derive(Default)]
struct TickState {
    ticks: AtomicU64,
    last: Mutex<Option<OffsetDateTime>>,
}

/// Event source that re-runs its job on a fixed period.
///
/// Properties: `Interval` (positive integer, required) and `Period`
/// (`Millisecond`, `Second`, `Minute`, `Hour` or `Day`, default `Second`).
/// State: `Time` (RFC 3339 time of the last tick) and `Tick` (tick count).
pub struct TickerProvider {
    cancel: CancellationToken,
    state: Arc<TickState>,
}

impl TickerProvider {
    /// Timers stop when `cancel` fires.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            state: Arc::new(TickState::default()),
        }
    }
}

async fn run_timer(
    trigger: JobTrigger,
    period: Duration,
    state: Arc<TickState>,
    cancel: CancellationToken,
) {
    let mut tick = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tick.tick() => {}
        }
        state.ticks.fetch_add(1, Ordering::Relaxed);
        *state.last.lock() = Some(OffsetDateTime::now_utc());

        match trigger.fire().await {
            Ok(()) => trace!("tick handled"),
            Err(EngineError::Released) => {
                debug!("job released; timer stopped");
                return;
            }
            Err(e) => warn!(error = %e, "tick run failed"),
        }
    }
}

#[async_trait]
impl Provider for TickerProvider {
    fn name(&self) -> &'static str {
        TICKER
    }

    fn new_instance(&self) -> Arc<dyn Provider> {
        Arc::new(Self::new(self.cancel.child_token()))
    }

    fn is_event_source(&self) -> bool {
        true
    }

    async fn register(&self, ctx: RegisterContext<'_>) -> Result<(), ProviderError> {
        let period = tick_period(ctx.properties())?;
        debug!(job = %ctx.job().name(), task = %ctx.task().title(), ?period, "arming ticker");
        tokio::spawn(run_timer(
            ctx.trigger(),
            period,
            self.state.clone(),
            self.cancel.clone(),
        ));
        Ok(())
    }

    async fn execute(&self, _ctx: ExecuteContext<'_>) -> Result<Arc<dyn StateObject>, ProviderError> {
        let at = (*self.state.last.lock()).unwrap_or_else(OffsetDateTime::now_utc);
        let stamp = at
            .format(&Rfc3339)
            .map_err(|e| ProviderError::Execution(e.to_string()))?;
        Ok(Arc::new(
            MapState::new()
                .with("Time", stamp)
                .with("Tick", self.state.ticks.load(Ordering::Relaxed).to_string()),
        ))
    }

    async fn cleanup(&self) {
        self.cancel.cancel();
    }
}
