//! The moderation decision engine.
//!
//! One consumer loop over canonical events. Command handling and policy
//! enforcement both fire independently for every message; candidate actions
//! pass through the authorization guard before anything is dispatched.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    audit::{AuditEvent, AuditLogger},
    authz::{authorize, AuthzDecision, DenyReason, Initiator, ProtectedSet},
    command::{CommandKind, CommandOutcome, CommandResolver},
    config::Config,
    dispatch::dispatch,
    domain::{Action, Roster, UserId},
    event::{normalize, InboundEvent, InboundMessage, MembershipChange, RawEvent},
    policy::{escalate, first_match, LinkPolicy, ViolationPolicy},
    store::ViolationStore,
    transport::port::TransportPort,
};

const MISSING_TARGET_TEXT: &str =
    "❌ Tell me who: mention them, reply to their message, or pass their id.";
const ROSTER_UNAVAILABLE_TEXT: &str = "❌ Can't verify group roles right now, try again later.";

pub struct ModerationEngine {
    cfg: Arc<Config>,
    transport: Arc<dyn TransportPort>,
    store: ViolationStore,
    resolver: CommandResolver,
    policies: Vec<Box<dyn ViolationPolicy>>,
    audit: AuditLogger,
    self_id: UserId,
}

impl ModerationEngine {
    pub fn new(cfg: Arc<Config>, transport: Arc<dyn TransportPort>, audit: AuditLogger) -> Self {
        let resolver = CommandResolver::new(cfg.command_aliases.clone());

        let mut policies: Vec<Box<dyn ViolationPolicy>> = Vec::new();
        if cfg.link_policy_enabled {
            policies.push(Box::new(LinkPolicy::new()));
        }

        let self_id = transport.self_identity();

        Self {
            cfg,
            transport,
            store: ViolationStore::new(),
            resolver,
            policies,
            audit,
            self_id,
        }
    }

    /// Consume canonical events until the channel closes.
    pub async fn run(&self, mut events: mpsc::Receiver<RawEvent>) {
        while let Some(raw) = events.recv().await {
            self.handle_raw(raw).await;
        }
        info!("event channel closed, engine stopping");
    }

    pub async fn handle_raw(&self, raw: RawEvent) {
        let Some(event) = normalize(raw, self.self_id) else {
            debug!("event ignored by normalizer");
            return;
        };

        match event {
            InboundEvent::Message(msg) => self.handle_message(&msg).await,
            InboundEvent::Membership(change) => self.handle_membership(change),
        }
    }

    async fn handle_message(&self, msg: &InboundMessage) {
        match self
            .resolver
            .resolve(msg, |raw| self.transport.normalize_user_arg(raw))
        {
            CommandOutcome::Resolved { kind, target } => {
                self.handle_command(msg, kind, target).await;
            }
            CommandOutcome::MissingTarget { kind } => {
                debug!(
                    chat_id = msg.chat_id.0,
                    sender = msg.sender_id.0,
                    command = kind.as_str(),
                    "command without resolvable target"
                );
                self.reply(msg, MISSING_TARGET_TEXT).await;
            }
            CommandOutcome::NotACommand => {}
        }

        self.enforce_policies(msg).await;
    }

    async fn handle_command(&self, msg: &InboundMessage, kind: CommandKind, target: UserId) {
        // Role data comes first; store locks are never held across roster calls.
        let Some(roster) = self.fetch_roster(msg).await else {
            // Fail closed: no roles, no privileged command.
            self.reply(msg, ROSTER_UNAVAILABLE_TEXT).await;
            return;
        };
        let sender_role = roster.role_of(msg.sender_id);
        let bot_role = roster.role_of(self.self_id);

        match kind {
            CommandKind::Kick => {
                let action = Action::RemoveParticipant {
                    chat_id: msg.chat_id,
                    user_id: target,
                };
                let initiator = Some(Initiator {
                    user_id: msg.sender_id,
                    role: sender_role,
                });

                if let AuthzDecision::Deny(reason) =
                    authorize(&action, initiator, bot_role, self.protected_set(roster.owner_id))
                {
                    self.audit.log(AuditEvent::command(
                        msg.chat_id,
                        msg.sender_id,
                        kind,
                        Some(target),
                        false,
                        Some(reason.as_str()),
                    ));
                    self.reply(msg, deny_text(reason)).await;
                    return;
                }

                let report = dispatch(self.transport.as_ref(), vec![action]).await;
                if report.all_succeeded() {
                    self.audit.log(AuditEvent::command(
                        msg.chat_id,
                        msg.sender_id,
                        kind,
                        Some(target),
                        true,
                        None,
                    ));
                    self.reply(msg, &format!("✅ Removed user {}.", target.0))
                        .await;
                } else {
                    self.audit_failures(msg, &report.failures);
                    self.reply(msg, &format!("❌ Couldn't remove user {}.", target.0))
                        .await;
                }
            }
            CommandKind::ResetWarnings => {
                if !sender_role.is_privileged() {
                    self.audit.log(AuditEvent::command(
                        msg.chat_id,
                        msg.sender_id,
                        kind,
                        Some(target),
                        false,
                        Some(DenyReason::SenderNotAuthorized.as_str()),
                    ));
                    self.reply(msg, deny_text(DenyReason::SenderNotAuthorized))
                        .await;
                    return;
                }

                self.store.reset(msg.chat_id, target).await;
                self.audit.log(AuditEvent::command(
                    msg.chat_id,
                    msg.sender_id,
                    kind,
                    Some(target),
                    true,
                    None,
                ));
                let report = dispatch(
                    self.transport.as_ref(),
                    vec![Action::React {
                        message: msg.message_ref,
                        emoji: "✅".to_string(),
                    }],
                )
                .await;
                self.audit_failures(msg, &report.failures);
            }
        }
    }

    async fn enforce_policies(&self, msg: &InboundMessage) {
        let Some(policy) = first_match(&self.policies, msg) else {
            return;
        };

        // Without roles we could punish an admin or escalate on a guess; skip
        // enforcement for this message instead.
        let Some(roster) = self.fetch_roster(msg).await else {
            return;
        };
        let sender_role = roster.role_of(msg.sender_id);
        if self.cfg.admin_exempt && sender_role.is_privileged() {
            debug!(
                chat_id = msg.chat_id.0,
                sender = msg.sender_id.0,
                policy = policy.name(),
                "sender is exempt from policy"
            );
            return;
        }
        let bot_role = roster.role_of(self.self_id);

        let count = self.store.increment(msg.chat_id, msg.sender_id).await;
        let escalation = escalate(
            self.cfg.remove_threshold,
            count,
            msg,
            policy.describe(),
            bot_role.is_privileged(),
        );

        self.audit.log(AuditEvent::violation(
            msg.chat_id,
            msg.sender_id,
            policy.name(),
            count,
            &msg.text,
        ));

        if escalation.removal_skipped {
            warn!(
                chat_id = msg.chat_id.0,
                user = msg.sender_id.0,
                "terminal tier reached but bot is not admin, removal skipped"
            );
        }
        if escalation.reset {
            // The counter clears now, whether or not the removal goes through.
            self.store.reset(msg.chat_id, msg.sender_id).await;
        }

        let protected = self.protected_set(roster.owner_id);
        let mut approved = Vec::with_capacity(escalation.actions.len());
        for action in escalation.actions {
            match authorize(&action, None, bot_role, protected) {
                AuthzDecision::Allow => approved.push(action),
                AuthzDecision::Deny(reason) => {
                    debug!(
                        action = ?action,
                        reason = reason.as_str(),
                        "policy action dropped by authorization"
                    );
                }
            }
        }

        let report = dispatch(self.transport.as_ref(), approved).await;
        self.audit_failures(msg, &report.failures);
    }

    fn handle_membership(&self, change: MembershipChange) {
        for user in &change.users {
            info!(
                chat_id = change.chat_id.0,
                user = user.0,
                kind = ?change.kind,
                "membership change"
            );
            self.audit
                .log(AuditEvent::membership(change.chat_id, *user, change.kind));
        }
    }

    async fn fetch_roster(&self, msg: &InboundMessage) -> Option<Roster> {
        match self.transport.get_roster(msg.chat_id).await {
            Ok(roster) => Some(roster),
            Err(e) => {
                warn!(chat_id = msg.chat_id.0, error = %e, "roster unavailable, failing closed");
                None
            }
        }
    }

    fn protected_set(&self, group_owner: Option<UserId>) -> ProtectedSet {
        ProtectedSet {
            group_owner,
            bot_owner: self.cfg.bot_owner,
            self_id: self.self_id,
        }
    }

    fn audit_failures(&self, msg: &InboundMessage, failures: &[(Action, crate::Error)]) {
        for (action, error) in failures {
            self.audit.log(AuditEvent::action_failed(
                msg.chat_id,
                &format!("{action:?}"),
                &error.to_string(),
            ));
        }
    }

    async fn reply(&self, msg: &InboundMessage, text: &str) {
        if let Err(e) = self
            .transport
            .send_text(msg.chat_id, text, Some(msg.message_ref))
            .await
        {
            warn!(chat_id = msg.chat_id.0, error = %e, "failed to send reply");
        }
    }
}

fn deny_text(reason: DenyReason) -> &'static str {
    match reason {
        DenyReason::SelfTarget => "❌ I'm not removing myself.",
        DenyReason::ProtectedOwner => "❌ That user is protected and can't be targeted.",
        DenyReason::SenderNotAuthorized => "❌ Only group admins can use moderation commands.",
        DenyReason::BotNotPrivileged => "❌ I need to be a group admin to do that.",
    }
}
