//! Free-text relation token resolution.
//!
//! Agents invent relation vocabulary ("blockedBy", "related", "is part of").
//! This resolver normalizes the token and either recognizes it or infers a
//! default relation from the endpoint kinds. It never fails: every input
//! resolves to some relation, so agent-originated graph edits are never
//! rejected outright.

use crate::models::EntityKind;
use crate::vocab::{self, RelationshipType};

/// Outcome of token resolution. `original` is set only when the supplied
/// token was unknown and a default relation was inferred, so callers can
/// audit agent-invented vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    /// Normalized known token: a canonical relation name or a deprecated
    /// alias (canonicalization happens in direction normalization).
    pub token: String,
    pub original: Option<String>,
}

impl ResolvedToken {
    /// True when the relation was inferred rather than recognized.
    pub fn is_fallback(&self) -> bool {
        self.original.is_some()
    }
}

/// Normalize a free-text relation token: camelCase boundaries become
/// underscores, separator runs collapse, everything outside `[a-z0-9_]`
/// is stripped.
pub fn normalize_token(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut prev_alnum = false;
    for ch in raw.trim().chars() {
        if ch.is_ascii_uppercase() {
            if prev_alnum {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_alnum = true;
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_alnum = true;
        } else if ch == '_' || ch.is_whitespace() || ch == '-' || ch == '.' {
            out.push('_');
            prev_alnum = false;
        }
        // Anything else is stripped without becoming a separator.
    }

    let mut collapsed = String::with_capacity(out.len());
    for ch in out.chars() {
        if ch == '_' && collapsed.ends_with('_') {
            continue;
        }
        collapsed.push(ch);
    }
    collapsed.trim_matches('_').to_string()
}

/// Resolve a free-text relation token for a (source kind, destination kind)
/// pair. Known and deprecated tokens pass through unchanged; anything else
/// falls back to the kind-pair default relation with the original token
/// recorded.
pub fn resolve_token(raw: &str, src: EntityKind, dst: EntityKind) -> ResolvedToken {
    let normalized = normalize_token(raw);
    if vocab::is_known_token(&normalized) {
        return ResolvedToken {
            token: normalized,
            original: None,
        };
    }
    let fallback: RelationshipType = vocab::default_relation(src, dst);
    ResolvedToken {
        token: fallback.to_string(),
        original: Some(raw.to_string()),
    }
}
