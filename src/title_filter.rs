use crate::error::Result;
use regex::{Regex, RegexBuilder};
use std::collections::{HashMap, HashSet};

/// Outcome of testing a subject title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TitleDecision {
    /// Title is whitelisted and bypasses the hit statistics filter
    WhitelistAccept,
    Reject,
    DefaultAccept,
}

/// Title filter settings
#[derive(Debug, Clone, Default)]
pub struct TitleFilterParams {
    pub whitelist: Option<HashSet<String>>,
    pub blacklist: Option<HashSet<String>>,
    /// Titles must match this (case-insensitive)
    pub positive_regex: Option<String>,
    /// Titles must not match this (case-insensitive)
    pub negative_regex: Option<String>,
    /// Titles are cut at the first occurrence of this marker and only one
    /// full title per cut form is let through
    pub truncate_after: Option<String>,
}

/// Accepts or rejects subject titles.
///
/// Checks run in order: whitelist, blacklist, truncation dedup, positive
/// regex, negative regex. With truncation configured the filter is stateful:
/// it remembers which full title first produced each truncated title and
/// rejects other full titles that truncate to the same text. The first full
/// title keeps being accepted.
#[derive(Debug, Clone)]
pub struct TitleFilter {
    whitelist: HashSet<String>,
    blacklist: HashSet<String>,
    positive_regex: Option<Regex>,
    negative_regex: Option<Regex>,
    truncate_after: Option<String>,
    truncated: HashMap<String, String>,
}

fn compile(pattern: &str) -> Result<Regex> {
    Ok(RegexBuilder::new(pattern).case_insensitive(true).build()?)
}

impl TitleFilter {
    pub fn new(params: &TitleFilterParams) -> Result<Self> {
        Ok(TitleFilter {
            whitelist: params.whitelist.clone().unwrap_or_default(),
            blacklist: params.blacklist.clone().unwrap_or_default(),
            positive_regex: params.positive_regex.as_deref().map(compile).transpose()?,
            negative_regex: params.negative_regex.as_deref().map(compile).transpose()?,
            truncate_after: params.truncate_after.clone(),
            truncated: HashMap::new(),
        })
    }

    pub fn accept(&mut self, title: &str) -> TitleDecision {
        if self.whitelist.contains(title) {
            return TitleDecision::WhitelistAccept;
        }

        if self.blacklist.contains(title) {
            return TitleDecision::Reject;
        }

        if let Some(marker) = self.truncate_after.as_deref() {
            let truncated = match title.find(marker) {
                Some(pos) => &title[..pos],
                None => title,
            };
            match self.truncated.get(truncated) {
                Some(first) if first != title => return TitleDecision::Reject,
                Some(_) => {}
                None => {
                    self.truncated
                        .insert(truncated.to_string(), title.to_string());
                }
            }
        }

        if let Some(regex) = &self.positive_regex {
            if !regex.is_match(title) {
                return TitleDecision::Reject;
            }
        }

        if let Some(regex) = &self.negative_regex {
            if regex.is_match(title) {
                return TitleDecision::Reject;
            }
        }

        TitleDecision::DefaultAccept
    }

    /// Number of distinct truncated titles seen so far
    pub fn truncated_count(&self) -> usize {
        self.truncated.len()
    }
}
