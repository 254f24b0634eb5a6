//! Tiered credential resolution.
//!
//! Every discovered address is walked through the credential tiers in a
//! fixed order until one pair opens a session:
//!
//! 1. the explicit pair given on the command line (if any)
//! 2. the default factory credentials, in list order
//! 3. pairs typed in by the operator, for as long as they keep trying
//!
//! The walk is modelled as [`ResolveState`] plus a pure transition
//! function; [`CredentialResolver`] drives it against a [`DeviceInspector`].

pub mod prompt;

use crate::error::AuthResult;
use crate::types::{default_credentials, CredentialTier, Credentials};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use tracing::{debug, info};

pub use prompt::TerminalPrompt;

/// Opens authenticated sessions on a device.
#[async_trait]
pub trait DeviceInspector: Send + Sync {
    /// Handle kept for an authenticated device.
    type Session: Send;

    /// Authenticate with `credentials` and query the device identity.
    ///
    /// Any error counts as a failed attempt.
    async fn open_session(
        &self,
        address: Ipv4Addr,
        credentials: &Credentials,
    ) -> AuthResult<Self::Session>;
}

/// Operator answer to a credential prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptReply {
    /// Try this pair.
    Submit(Credentials),
    /// Do not try this device.
    Decline,
    /// Prompt interrupted (Ctrl-C).
    Cancelled,
}

/// Asks the operator for credentials.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn prompt(&self, address: Ipv4Addr) -> PromptReply;
}

/// Terminal result of resolving one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A session was opened with these credentials.
    Authenticated(Credentials),
    /// Every available tier was exhausted.
    Failed,
    /// The operator declined or interrupted the prompt.
    Skipped,
}

impl AuthOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        match self {
            Self::Authenticated(creds) => Some(creds),
            Self::Failed | Self::Skipped => None,
        }
    }
}

/// Outcome of resolving one address, with the session when authenticated.
#[derive(Debug)]
pub struct Resolution<S> {
    pub address: Ipv4Addr,
    pub outcome: AuthOutcome,
    /// Tier the accepted pair came from.
    pub tier: Option<CredentialTier>,
    pub session: Option<S>,
}

/// Credentials available to one resolution.
#[derive(Debug, Clone)]
pub struct TierPlan {
    explicit: Option<Credentials>,
    defaults: Vec<Credentials>,
    interactive: bool,
}

impl TierPlan {
    /// Build a plan; default entries equal to the explicit pair are dropped
    /// since that pair is tried first anyway.
    pub fn new(explicit: Option<Credentials>, defaults: &[Credentials], interactive: bool) -> Self {
        let defaults = defaults
            .iter()
            .filter(|creds| explicit.as_ref() != Some(*creds))
            .cloned()
            .collect();

        Self {
            explicit,
            defaults,
            interactive,
        }
    }

    pub fn explicit(&self) -> Option<&Credentials> {
        self.explicit.as_ref()
    }

    pub fn defaults(&self) -> &[Credentials] {
        &self.defaults
    }
}

/// What happened while in a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Resolution begins.
    Start,
    /// The attempted pair opened a session.
    Accepted(Credentials),
    /// The attempted pair failed.
    Rejected,
    /// The operator declined, interrupted, or gave no username.
    Declined,
}

/// Position of one address in the tier walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveState {
    Init,
    TryExplicit,
    TryDefaults { next: usize },
    TryInteractive,
    Finished(AuthOutcome),
}

impl ResolveState {
    /// Transition on `event`. Finished states are absorbing.
    pub fn advance(self, plan: &TierPlan, event: Event) -> Self {
        match (self, event) {
            (Self::Finished(outcome), _) => Self::Finished(outcome),
            (_, Event::Accepted(creds)) => Self::Finished(AuthOutcome::Authenticated(creds)),
            (Self::Init, _) => {
                if plan.explicit().is_some() {
                    Self::TryExplicit
                } else {
                    Self::defaults_from(plan, 0)
                }
            }
            (Self::TryExplicit, _) => Self::defaults_from(plan, 0),
            (Self::TryDefaults { next }, _) => Self::defaults_from(plan, next + 1),
            (Self::TryInteractive, Event::Declined) => Self::Finished(AuthOutcome::Skipped),
            (Self::TryInteractive, _) => Self::TryInteractive,
        }
    }

    fn defaults_from(plan: &TierPlan, index: usize) -> Self {
        if index < plan.defaults().len() {
            Self::TryDefaults { next: index }
        } else if plan.interactive {
            Self::TryInteractive
        } else {
            Self::Finished(AuthOutcome::Failed)
        }
    }

    fn tier(&self) -> Option<CredentialTier> {
        match self {
            Self::TryExplicit => Some(CredentialTier::Explicit),
            Self::TryDefaults { .. } => Some(CredentialTier::Default),
            Self::TryInteractive => Some(CredentialTier::Interactive),
            Self::Init | Self::Finished(_) => None,
        }
    }
}

/// The explicit pair, present only when both halves were supplied.
pub fn explicit_pair(username: Option<&str>, password: Option<&str>) -> Option<Credentials> {
    match (username, password) {
        (Some(user), Some(pass)) => Some(Credentials::new(user, pass)),
        _ => None,
    }
}

/// Resolves credentials for discovered addresses.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    explicit: Option<Credentials>,
    defaults: Vec<Credentials>,
}

impl CredentialResolver {
    /// Resolver using the built-in default credential list.
    pub fn new(explicit: Option<Credentials>) -> Self {
        Self {
            explicit,
            defaults: default_credentials(),
        }
    }

    /// Replace the default credential list.
    pub fn with_defaults(mut self, defaults: Vec<Credentials>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Walk one address through the tiers.
    ///
    /// Without a prompt the interactive tier is unavailable and exhausting
    /// the defaults ends in [`AuthOutcome::Failed`].
    pub async fn resolve<I: DeviceInspector>(
        &self,
        address: Ipv4Addr,
        inspector: &I,
        prompt: Option<&dyn CredentialPrompt>,
    ) -> Resolution<I::Session> {
        let plan = TierPlan::new(self.explicit.clone(), &self.defaults, prompt.is_some());
        let mut state = ResolveState::Init.advance(&plan, Event::Start);
        let mut session = None;
        let mut tier = None;

        loop {
            let creds = match &state {
                ResolveState::Finished(_) => break,
                ResolveState::Init => None,
                ResolveState::TryExplicit => plan.explicit().cloned(),
                ResolveState::TryDefaults { next } => plan.defaults().get(*next).cloned(),
                ResolveState::TryInteractive => match prompt {
                    Some(prompt) => match prompt.prompt(address).await {
                        PromptReply::Submit(creds) if !creds.username.is_empty() => Some(creds),
                        _ => None,
                    },
                    None => None,
                },
            };

            let event = match creds {
                Some(creds) => match inspector.open_session(address, &creds).await {
                    Ok(opened) => {
                        tier = state.tier();
                        session = Some(opened);
                        Event::Accepted(creds)
                    }
                    Err(e) => {
                        debug!(
                            address = %address,
                            username = %creds.username,
                            tier = ?state.tier(),
                            error = %e,
                            "Authentication attempt failed"
                        );
                        Event::Rejected
                    }
                },
                None => Event::Declined,
            };

            state = state.advance(&plan, event);
        }

        let outcome = match state {
            ResolveState::Finished(outcome) => outcome,
            _ => AuthOutcome::Failed,
        };

        match &outcome {
            AuthOutcome::Authenticated(creds) => info!(
                address = %address,
                username = %creds.username,
                tier = ?tier,
                "Authenticated"
            ),
            AuthOutcome::Failed => info!(address = %address, "No credentials accepted"),
            AuthOutcome::Skipped => info!(address = %address, "Skipped by operator"),
        }

        Resolution {
            address,
            outcome,
            tier,
            session,
        }
    }

    /// Resolve every address, one at a time, in ascending order.
    ///
    /// Addresses are deduplicated; the prompt needs the terminal so nothing
    /// runs concurrently.
    pub async fn resolve_all<I: DeviceInspector>(
        &self,
        addresses: impl IntoIterator<Item = Ipv4Addr>,
        inspector: &I,
        prompt: Option<&dyn CredentialPrompt>,
    ) -> Vec<Resolution<I::Session>> {
        let addresses: BTreeSet<Ipv4Addr> = addresses.into_iter().collect();
        let mut resolutions = Vec::with_capacity(addresses.len());

        for address in addresses {
            resolutions.push(self.resolve(address, inspector, prompt).await);
        }
        resolutions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// Accepts a fixed set of pairs per address and records every attempt.
    #[derive(Default)]
    struct MockInspector {
        accepted: HashMap<Ipv4Addr, Vec<Credentials>>,
        attempts: Mutex<Vec<(Ipv4Addr, Credentials)>>,
    }

    impl MockInspector {
        fn accepting(mut self, address: Ipv4Addr, user: &str, pass: &str) -> Self {
            self.accepted
                .entry(address)
                .or_default()
                .push(Credentials::new(user, pass));
            self
        }

        fn attempts(&self) -> Vec<Credentials> {
            self.attempts
                .lock()
                .unwrap()
                .iter()
                .map(|(_, c)| c.clone())
                .collect()
        }
    }

    #[async_trait]
    impl DeviceInspector for MockInspector {
        type Session = Credentials;

        async fn open_session(
            &self,
            address: Ipv4Addr,
            credentials: &Credentials,
        ) -> AuthResult<Credentials> {
            self.attempts
                .lock()
                .unwrap()
                .push((address, credentials.clone()));

            let accepted = self
                .accepted
                .get(&address)
                .is_some_and(|list| list.contains(credentials));
            if accepted {
                Ok(credentials.clone())
            } else {
                Err(AuthError::Rejected("401".into()))
            }
        }
    }

    /// Replays scripted replies, then declines.
    struct ScriptedPrompt {
        replies: Mutex<VecDeque<PromptReply>>,
    }

    impl ScriptedPrompt {
        fn new(replies: Vec<PromptReply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl CredentialPrompt for ScriptedPrompt {
        async fn prompt(&self, _address: Ipv4Addr) -> PromptReply {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(PromptReply::Decline)
        }
    }

    const CAM: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 100);

    fn creds(user: &str, pass: &str) -> Credentials {
        Credentials::new(user, pass)
    }

    #[tokio::test]
    async fn test_first_default_match_wins() {
        let inspector = MockInspector::default()
            .accepting(CAM, "admin", "12345")
            .accepting(CAM, "root", "root");
        let resolver = CredentialResolver::new(None);

        let resolution = resolver.resolve(CAM, &inspector, None).await;

        assert_eq!(resolution.outcome, AuthOutcome::Authenticated(creds("admin", "12345")));
        assert_eq!(resolution.tier, Some(CredentialTier::Default));
        assert_eq!(resolution.session, Some(creds("admin", "12345")));
        assert_eq!(
            inspector.attempts(),
            vec![creds("admin", "admin"), creds("admin", ""), creds("admin", "12345")]
        );
    }

    #[tokio::test]
    async fn test_explicit_failure_falls_through_to_defaults() {
        let inspector = MockInspector::default().accepting(CAM, "admin", "");
        let resolver = CredentialResolver::new(explicit_pair(Some("ops"), Some("s3cret")));

        let resolution = resolver.resolve(CAM, &inspector, None).await;

        assert_eq!(resolution.outcome, AuthOutcome::Authenticated(creds("admin", "")));
        assert_eq!(resolution.tier, Some(CredentialTier::Default));
        assert_eq!(
            inspector.attempts(),
            vec![creds("ops", "s3cret"), creds("admin", "admin"), creds("admin", "")]
        );
    }

    #[tokio::test]
    async fn test_explicit_success_is_tagged() {
        let inspector = MockInspector::default().accepting(CAM, "ops", "s3cret");
        let resolver = CredentialResolver::new(explicit_pair(Some("ops"), Some("s3cret")));

        let resolution = resolver.resolve(CAM, &inspector, None).await;

        assert_eq!(resolution.tier, Some(CredentialTier::Explicit));
        assert_eq!(inspector.attempts().len(), 1);
    }

    #[test]
    fn test_explicit_needs_both_halves() {
        assert!(explicit_pair(Some("admin"), None).is_none());
        assert!(explicit_pair(None, Some("pw")).is_none());
        assert_eq!(explicit_pair(Some("admin"), Some("")), Some(creds("admin", "")));
    }

    #[tokio::test]
    async fn test_explicit_pair_not_retried_as_default() {
        let inspector = MockInspector::default();
        let resolver = CredentialResolver::new(Some(creds("admin", "admin")));

        let resolution = resolver.resolve(CAM, &inspector, None).await;

        assert_eq!(resolution.outcome, AuthOutcome::Failed);
        let attempts = inspector.attempts();
        assert_eq!(attempts.len(), default_credentials().len());
        assert_eq!(
            attempts.iter().filter(|c| **c == creds("admin", "admin")).count(),
            1
        );
    }

    #[tokio::test]
    async fn test_non_interactive_exhaustion_fails() {
        let inspector = MockInspector::default();
        let resolution = CredentialResolver::new(None)
            .resolve(CAM, &inspector, None)
            .await;

        assert_eq!(resolution.outcome, AuthOutcome::Failed);
        assert!(resolution.session.is_none());
        assert!(resolution.tier.is_none());
        assert_eq!(inspector.attempts(), default_credentials());
    }

    #[tokio::test]
    async fn test_operator_decline_skips() {
        let inspector = MockInspector::default();
        let prompt = ScriptedPrompt::new(vec![PromptReply::Decline]);

        let resolution = CredentialResolver::new(None)
            .resolve(CAM, &inspector, Some(&prompt))
            .await;

        assert_eq!(resolution.outcome, AuthOutcome::Skipped);
        assert!(resolution.session.is_none());
    }

    #[tokio::test]
    async fn test_cancel_and_empty_username_skip() {
        for reply in [PromptReply::Cancelled, PromptReply::Submit(creds("", "x"))] {
            let inspector = MockInspector::default();
            let prompt = ScriptedPrompt::new(vec![reply]);

            let resolution = CredentialResolver::new(None)
                .with_defaults(Vec::new())
                .resolve(CAM, &inspector, Some(&prompt))
                .await;

            assert_eq!(resolution.outcome, AuthOutcome::Skipped);
            assert!(inspector.attempts().is_empty());
        }
    }

    #[tokio::test]
    async fn test_interactive_retries_until_accepted() {
        let inspector = MockInspector::default().accepting(CAM, "installer", "cam-2024");
        let prompt = ScriptedPrompt::new(vec![
            PromptReply::Submit(creds("installer", "wrong")),
            PromptReply::Submit(creds("installer", "cam-2024")),
        ]);

        let resolution = CredentialResolver::new(None)
            .resolve(CAM, &inspector, Some(&prompt))
            .await;

        assert_eq!(
            resolution.outcome,
            AuthOutcome::Authenticated(creds("installer", "cam-2024"))
        );
        assert_eq!(resolution.tier, Some(CredentialTier::Interactive));
        assert_eq!(inspector.attempts().len(), default_credentials().len() + 2);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let inspector = MockInspector::default().accepting(CAM, "root", "");
        let resolver = CredentialResolver::new(None);

        let first = resolver.resolve(CAM, &inspector, None).await;
        let second = resolver.resolve(CAM, &inspector, None).await;

        assert_eq!(first.outcome, second.outcome);
        assert_eq!(first.tier, second.tier);
    }

    #[tokio::test]
    async fn test_resolve_all_is_sorted_and_independent() {
        let other = Ipv4Addr::new(192, 168, 1, 20);
        let inspector = MockInspector::default().accepting(CAM, "admin", "admin");
        let resolver = CredentialResolver::new(None);

        let resolutions = resolver
            .resolve_all([CAM, other, CAM], &inspector, None)
            .await;

        assert_eq!(resolutions.len(), 2);
        assert_eq!(resolutions[0].address, other);
        assert_eq!(resolutions[0].outcome, AuthOutcome::Failed);
        assert_eq!(resolutions[1].address, CAM);
        assert!(resolutions[1].outcome.is_authenticated());
    }

    #[test]
    fn test_state_transitions() {
        let plan = TierPlan::new(
            Some(creds("admin", "admin")),
            &[creds("admin", "admin"), creds("root", "root")],
            false,
        );
        assert_eq!(plan.explicit(), Some(&creds("admin", "admin")));
        assert_eq!(plan.defaults(), &[creds("root", "root")]);

        let state = ResolveState::Init.advance(&plan, Event::Start);
        assert_eq!(state, ResolveState::TryExplicit);

        let state = state.advance(&plan, Event::Rejected);
        assert_eq!(state, ResolveState::TryDefaults { next: 0 });

        let state = state.advance(&plan, Event::Rejected);
        assert_eq!(state, ResolveState::Finished(AuthOutcome::Failed));

        let state = state.advance(&plan, Event::Accepted(creds("x", "y")));
        assert_eq!(state, ResolveState::Finished(AuthOutcome::Failed));
    }

    #[test]
    fn test_empty_plan_goes_straight_to_prompt() {
        let plan = TierPlan::new(None, &[], true);
        let state = ResolveState::Init.advance(&plan, Event::Start);
        assert_eq!(state, ResolveState::TryInteractive);

        let state = state.clone().advance(&plan, Event::Rejected);
        assert_eq!(state, ResolveState::TryInteractive);
        assert_eq!(
            state.advance(&plan, Event::Declined),
            ResolveState::Finished(AuthOutcome::Skipped)
        );
    }
}
