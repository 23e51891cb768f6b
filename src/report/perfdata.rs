/// Numbers print without a trailing `.0` when whole.
pub fn format_number(value: f64) -> String {
    value.to_string()
}

/// `'label'=value[uom];warn;crit;min;max`, with trailing empty fields removed.
pub fn perfdata_token(
    label: &str,
    value: f64,
    uom: Option<&str>,
    warn: Option<f64>,
    crit: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
) -> String {
    let mut fields = vec![format!(
        "'{}'={}{}",
        label.replace('\'', "''"),
        format_number(value),
        uom.unwrap_or("")
    )];
    fields.extend([warn, crit, min, max].into_iter().map(|v| v.map(format_number).unwrap_or_default()));

    while fields.len() > 1 && fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(75.0), "75");
        assert_eq!(format_number(33.3), "33.3");
        assert_eq!(format_number(1_700_000_000.0), "1700000000");
    }

    #[test]
    fn test_token_strips_trailing_empty_fields() {
        assert_eq!(perfdata_token("a", 1.0, None, None, None, None, None), "'a'=1");
        assert_eq!(perfdata_token("a", 1.0, Some("s"), Some(5.0), None, None, None), "'a'=1s;5");
        assert_eq!(perfdata_token("a", 1.0, None, None, None, Some(0.0), None), "'a'=1;;;0");
    }

    #[test]
    fn test_token_keeps_inner_empty_fields() {
        assert_eq!(
            perfdata_token("used", 8.0, None, None, Some(5.0), Some(0.0), Some(10.0)),
            "'used'=8;;5;0;10"
        );
    }

    #[test]
    fn test_token_quotes_label() {
        assert_eq!(perfdata_token("it's", 2.0, Some("%"), None, None, None, None), "'it''s'=2%");
    }
}
