use std::sync::atomic::{AtomicU64, Ordering};

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    Data, Orbit, Request, Response, Rocket,
};

/// Sequence number tying a response log line back to its request line.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct RequestId(u64);

impl RequestId {
    /// Atomically take the next sequence number.
    fn next() -> RequestId {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        RequestId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// A fairing that logs every request and response pair, correlated by
/// sequence number. Client errors log as warnings and server errors as
/// errors, so 4xx/5xx traffic stands out in the output.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let config = rocket.config();
        let scheme = if config.tls_enabled() { "https" } else { "http" };
        info!(
            "Survey backend listening on {scheme}://{}:{}",
            config.address, config.port
        );
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = req.local_cache(RequestId::next).0;
        info!("request {id}: {} {}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next).0;
        let status = res.status();
        let handler = req
            .route()
            .and_then(|route| route.name.as_deref())
            .unwrap_or("no matching route");
        let line = format!("request {id}: {status} from {handler}");
        match status.class() {
            StatusClass::ServerError => error!("{line}"),
            StatusClass::ClientError => warn!("{line}"),
            _ => info!("{line}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        info!("Survey backend shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_increase() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second.0 > first.0);
    }
}
