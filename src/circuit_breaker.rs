use failsafe::backoff::{self, Exponential};
use failsafe::failure_policy::{self, ConsecutiveFailures};
use failsafe::{Config, StateMachine};
use std::time::Duration;

/// Breaker guarding calls to the generative-text service.
pub type LlmCircuitBreaker = StateMachine<ConsecutiveFailures<Exponential>, ()>;

/// Creates the breaker used in front of the model server.
///
/// Five consecutive failures open it; it then rejects calls for an
/// exponentially growing window (10s up to 60s) before letting a probe
/// through. A rejected call costs nothing, so intake replies fall back to the
/// templated summary immediately instead of waiting out a request timeout.
pub fn create_llm_circuit_breaker() -> LlmCircuitBreaker {
    let backoff_strategy = backoff::exponential(Duration::from_secs(10), Duration::from_secs(60));
    let failure_policy = failure_policy::consecutive_failures(5, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use failsafe::{CircuitBreaker, Error};

    #[test]
    fn test_breaker_opens_after_five_failures() {
        let cb = create_llm_circuit_breaker();

        for _ in 0..5 {
            let result: Result<(), Error<&str>> = cb.call(|| Err::<(), &str>("model offline"));
            assert!(result.is_err());
        }

        let result: Result<(), Error<&str>> = cb.call(|| Ok::<(), &str>(()));
        assert!(matches!(result, Err(Error::Rejected)));
    }

    #[test]
    fn test_breaker_passes_successes_through() {
        let cb = create_llm_circuit_breaker();
        let result: Result<&str, Error<&str>> = cb.call(|| Ok::<&str, &str>("summary"));
        assert_eq!(result.unwrap(), "summary");
    }
}
