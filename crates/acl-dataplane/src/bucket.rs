//! Fixed-capacity rule buckets and the bounded bucket scan.

use crate::classify::MatchState;
use crate::rule::AclRule;
use crate::store::StoreError;
use crate::MAX_BUCKET_RULES;

/// Observer hook invoked by [`RuleBucket::scan`].
///
/// The default methods do nothing and compile away.
pub trait RuleProbe {
    /// Called before the full predicate is evaluated for a candidate rule.
    #[inline(always)]
    fn on_predicate(&mut self, _rule: &AclRule) {}

    /// Called once when a rule matches.
    #[inline(always)]
    fn on_match(&mut self, _rule: &AclRule) {}
}

/// Probe that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl RuleProbe for NoProbe {}

/// Rules sharing one bucket index, in enumeration order.
///
/// Capacity is fixed at [`MAX_BUCKET_RULES`]; slots past `len` are unused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBucket {
    rules: [AclRule; MAX_BUCKET_RULES],
    len: usize,
}

impl Default for RuleBucket {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleBucket {
    pub const fn new() -> Self {
        RuleBucket {
            rules: [AclRule::EMPTY; MAX_BUCKET_RULES],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == MAX_BUCKET_RULES
    }

    /// The occupied slots in enumeration order.
    pub fn rules(&self) -> &[AclRule] {
        &self.rules[..self.len]
    }

    /// Inserts a rule at `pos`, shifting later rules back.
    pub fn insert(&mut self, pos: usize, rule: AclRule) -> Result<(), StoreError> {
        if self.is_full() {
            return Err(StoreError::BucketFull {
                capacity: MAX_BUCKET_RULES,
            });
        }
        let pos = pos.min(self.len);
        self.rules.copy_within(pos..self.len, pos + 1);
        self.rules[pos] = rule;
        self.len += 1;
        Ok(())
    }

    /// Appends a rule after every existing one.
    pub fn push(&mut self, rule: AclRule) -> Result<(), StoreError> {
        self.insert(self.len, rule)
    }

    /// Removes the rule at `pos`, shifting later rules forward.
    pub fn remove(&mut self, pos: usize) -> Option<AclRule> {
        if pos >= self.len {
            return None;
        }
        let rule = self.rules[pos];
        self.rules.copy_within(pos + 1..self.len, pos);
        self.len -= 1;
        self.rules[self.len] = AclRule::EMPTY;
        Some(rule)
    }

    /// Scans the bucket for the first rule matching the packet in `state`.
    ///
    /// Visits at most [`MAX_BUCKET_RULES`] slots. On a match, sets
    /// `state.matched` and `state.action` and stops.
    #[inline]
    pub fn scan<P: RuleProbe + ?Sized>(&self, state: &mut MatchState, probe: &mut P) -> bool {
        for (i, rule) in self.rules.iter().enumerate() {
            if i >= self.len {
                break;
            }
            if !rule.is_candidate(state.table_id, state.hash) {
                continue;
            }

            probe.on_predicate(rule);
            if rule.matches(&state.tuple) {
                probe.on_match(rule);
                state.matched = true;
                state.action = rule.action;
                break;
            }
        }
        state.matched
    }
}
