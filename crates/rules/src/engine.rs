//! Substitution engine.
//!
//! Three cascading passes over one owned buffer: knowledge-base customers,
//! exact replacements, then regex masks. Each pass sees the output of the
//! previous one, so replacement text inserted early can be matched later.

use crate::fuzzy::partial_ratio;
use crate::{Customer, RegexRule, RuleError, RuleSet, Substitution};
use regex::{Captures, NoExpand, RegexBuilder};

/// Minimum partial-ratio score for a fuzzy customer match.
pub const FUZZY_THRESHOLD: f64 = 90.0;

/// Rewrites `text` with every rule of `rules`, returning the new text and the
/// substitution log in the order the matches happened.
pub fn anonymize(text: &str, rules: &RuleSet) -> Result<(String, Vec<Substitution>), RuleError> {
    let mut text = text.to_string();
    let mut log = Vec::new();

    apply_customers(&mut text, &rules.customers, &mut log)?;
    apply_exact(&mut text, &rules.exact_replacements, &mut log);
    apply_regex(&mut text, &rules.regex_replacements, &mut log)?;

    Ok((text, log))
}

fn apply_customers(
    text: &mut String,
    customers: &[Customer],
    log: &mut Vec<Substitution>,
) -> Result<(), RuleError> {
    for customer in customers {
        for candidate in customer.candidates() {
            if text.contains(candidate) {
                *text = text.replace(candidate, &customer.replacement);
                log.push(Substitution::new(candidate, &customer.replacement));
                continue;
            }

            let score = partial_ratio(candidate, text);
            if score < FUZZY_THRESHOLD {
                continue;
            }

            log::debug!(
                "[Rules] fuzzy match `{}` (score {:.1}) -> `{}`",
                candidate,
                score,
                customer.replacement
            );
            let re = RegexBuilder::new(&regex::escape(candidate))
                .case_insensitive(true)
                .build()
                .map_err(|source| RuleError::Candidate {
                    candidate: candidate.to_string(),
                    source,
                })?;
            let replaced = re
                .replace_all(text, NoExpand(&customer.replacement))
                .into_owned();
            *text = replaced;
            log.push(Substitution::new(candidate, &customer.replacement));
        }
    }
    Ok(())
}

fn apply_exact(text: &mut String, pairs: &[(String, String)], log: &mut Vec<Substitution>) {
    for (source, target) in pairs {
        if source.is_empty() || !text.contains(source.as_str()) {
            continue;
        }
        *text = text.replace(source.as_str(), target);
        log.push(Substitution::new(source, target));
    }
}

fn apply_regex(
    text: &mut String,
    rules: &[RegexRule],
    log: &mut Vec<Substitution>,
) -> Result<(), RuleError> {
    for (index, rule) in rules.iter().enumerate() {
        let re = rule.regex().map_err(|source| RuleError::InvalidPattern {
            index,
            pattern: rule.pattern.clone(),
            source,
        })?;

        // every replacement type is applied as a mask
        let value = rule.replacement_value.as_str();
        let replaced = re
            .replace_all(text, |caps: &Captures| {
                log.push(Substitution::new(&caps[0], value));
                value.to_string()
            })
            .into_owned();
        *text = replaced;
    }
    Ok(())
}
