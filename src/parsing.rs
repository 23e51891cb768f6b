use anyhow::{anyhow, bail, Context, Result};

use crate::types::SelectorRule;

/// Split `name=value` at the last `=`, so names and patterns may contain `=`.
pub fn parse_limit(decl: &str) -> Result<(String, f64)> {
    let (name, value) = decl
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("limit {:?} must look like name=value", decl))?;
    if name.is_empty() {
        bail!("limit {:?} has an empty name", decl);
    }
    let value = parse_threshold(value).with_context(|| format!("invalid limit {:?}", decl))?;
    Ok((name.to_string(), value))
}

pub fn parse_threshold(value: &str) -> Result<f64> {
    let parsed: f64 = value
        .trim()
        .parse()
        .with_context(|| format!("{:?} is not a number", value))?;
    if !parsed.is_finite() {
        bail!("{:?} is not a finite number", value);
    }
    Ok(parsed)
}

/// Parse `class[,label=key=value][,capacity=Q][,warn=N][,crit=N]`.
pub fn parse_selector(decl: &str) -> Result<SelectorRule> {
    let mut parts = decl.split(',');
    let storage_class = parts.next().unwrap_or("").trim();
    if storage_class.is_empty() {
        bail!("selector {:?} must start with a storage class or *", decl);
    }

    let mut rule = SelectorRule {
        storage_class: storage_class.to_string(),
        ..Default::default()
    };

    for option in parts {
        let (key, value) = option
            .split_once('=')
            .ok_or_else(|| anyhow!("selector option {:?} must look like key=value", option))?;
        match key.trim() {
            "label" => {
                let (label_key, label_value) = value
                    .split_once('=')
                    .ok_or_else(|| anyhow!("selector label {:?} must look like key=value", value))?;
                rule.label = Some((label_key.to_string(), label_value.to_string()));
            }
            "capacity" => rule.capacity = Some(value.to_string()),
            "warn" => rule.warn = Some(parse_threshold(value).with_context(|| format!("in selector {:?}", decl))?),
            "crit" => rule.crit = Some(parse_threshold(value).with_context(|| format!("in selector {:?}", decl))?),
            other => bail!("unknown selector option {:?} in {:?}", other, decl),
        }
    }

    Ok(rule)
}

/// Whitespace-separated list entries.
pub fn split_entries(raw: &str) -> impl Iterator<Item = &str> {
    raw.split_whitespace()
}
