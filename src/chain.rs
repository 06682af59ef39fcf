//! Ordered provider fallback.
//!
//! A chain is a slice of tiers. [`walk`] calls them in order until one
//! succeeds. Tiers whose credentials are missing are skipped without a
//! network call; if no tier is configured at all the walk fails with
//! `ProviderError::Configuration` before touching the network.

use std::future::Future;

use tracing::{error, info, warn};

use crate::provider::ProviderError;

/// One link of a provider chain.
pub trait Tier {
    /// Short label for logs, e.g. `google` or `gemini:gemini-1.5-flash`.
    fn label(&self) -> String;

    /// `Err(Configuration)` when the tier cannot be called.
    fn credential_check(&self) -> Result<(), ProviderError>;
}

/// `true` if at least one tier can be called.
pub fn any_configured<P: Tier>(tiers: &[P]) -> bool {
    tiers.iter().any(|t| t.credential_check().is_ok())
}

/// Call each configured tier with `call` until one returns `Ok`.
///
/// Every failure is logged and recorded; the next tier receives exactly the
/// same arguments because `call` captures them once.
pub async fn walk<'a, P, T, F, Fut>(
    chain: &'static str,
    tiers: &'a [P],
    mut call: F,
) -> Result<T, ProviderError>
where
    P: Tier,
    F: FnMut(&'a P) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut failures = Vec::new();
    let mut attempted = 0usize;

    for tier in tiers {
        let label = tier.label();
        if let Err(e) = tier.credential_check() {
            warn!(chain, tier = %label, error = %e, "tier not configured, skipping");
            failures.push(format!("{label}: {e}"));
            continue;
        }

        attempted += 1;
        match call(tier).await {
            Ok(value) => {
                if attempted > 1 {
                    info!(chain, tier = %label, "served by fallback tier");
                }
                return Ok(value);
            }
            Err(e) => {
                warn!(chain, tier = %label, error = %e, "tier failed, trying next");
                failures.push(format!("{label}: {e}"));
            }
        }
    }

    if attempted == 0 {
        error!(chain, "no configured provider");
        let detail = if failures.is_empty() {
            "no providers listed".to_string()
        } else {
            failures.join("; ")
        };
        return Err(ProviderError::Configuration(format!("{chain}: {detail}")));
    }

    error!(chain, attempted, "all tiers failed");
    Err(ProviderError::Exhausted { chain, failures })
}
