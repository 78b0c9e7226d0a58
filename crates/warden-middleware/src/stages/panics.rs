//! Panic recovery middleware.
//!
//! The single unwind boundary of the chain. A panic anywhere inside it
//! becomes [`WebError::Panic`] carrying the payload text and the backtrace
//! captured at the panic site, and the panics counter is bumped. The
//! request's task and every other request carry on unaffected.
//!
//! Backtraces are captured by a process-wide panic hook installed the first
//! time a [`Panics`] is created. The hook chains to whatever hook was
//! installed before it, so the usual stderr report is kept.

use crate::{
    middleware::{BoxFuture, Middleware, Next},
    types::{HandlerResult, Request},
};
use futures_util::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Once};
use warden_core::{RequestContext, WebError};
use warden_telemetry::Metrics;

thread_local! {
    /// Backtrace of the most recent panic on this thread.
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

fn install_backtrace_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::force_capture().to_string();
            LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            previous(info);
        }));
    });
}

fn take_backtrace() -> String {
    LAST_BACKTRACE
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_else(|| "<backtrace unavailable>".to_string())
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Recovers panics from the inner chain.
#[derive(Debug, Clone)]
pub struct Panics {
    metrics: Arc<Metrics>,
}

impl Panics {
    /// Creates the middleware and installs the backtrace hook if needed.
    #[must_use]
    pub fn new(metrics: Arc<Metrics>) -> Self {
        install_backtrace_hook();
        Self { metrics }
    }
}

impl Middleware for Panics {
    fn name(&self) -> &'static str {
        "panics"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            match AssertUnwindSafe(next.run(ctx, request)).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => {
                    self.metrics.add_panics();
                    Err(WebError::Panic {
                        message: payload_message(payload.as_ref()),
                        backtrace: take_backtrace(),
                    })
                }
            }
        })
    }
}
