use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;

use crate::models::prices::is_plausible_rate;

lazy_static! {
    // Tried in order; each captures a "123.45" style rate
    static ref RATE_PATTERNS: Vec<Regex> = vec![
        // "USD ... 133.25" within a table row
        Regex::new(r"(?i)USD[\s\S]{0,150}?(\d{3}\.\d{2})").unwrap(),
        // "133.25 NPR per USD"
        Regex::new(r"(?i)(\d{3}\.\d{2})\s*NPR.*USD").unwrap(),
        // "U.S. Dollar ... 133.25"
        Regex::new(r"(?i)US\s*Dollar[\s\S]{0,150}?(\d{3}\.\d{2})").unwrap(),
    ];
}

/// Collapse an HTML document into its visible text, one space between nodes
pub fn page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the first USD/NPR rate in `text` that falls inside the plausible band.
/// Matches outside the band are skipped.
pub fn extract_usd_rate(text: &str) -> Option<f64> {
    for pattern in RATE_PATTERNS.iter() {
        for cap in pattern.captures_iter(text) {
            let Ok(rate) = cap[1].parse::<f64>() else {
                continue;
            };
            if is_plausible_rate(rate) {
                return Some(rate);
            }
            tracing::debug!("Rejected implausible USD rate {} from forex page", rate);
        }
    }
    None
}

/// Extract the USD/NPR rate from a raw forex page
pub fn extract_usd_rate_from_html(html: &str) -> Option<f64> {
    extract_usd_rate(&page_text(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NRB_TABLE: &str = r#"
        <html><body>
        <table>
          <tr><th>Currency</th><th>Unit</th><th>Buy</th><th>Sell</th></tr>
          <tr><td>INR</td><td>100</td><td>160.00</td><td>160.15</td></tr>
          <tr><td>U.S. Dollar (USD)</td><td>1</td><td>136.42</td><td>137.02</td></tr>
        </table>
        </body></html>
    "#;

    #[test]
    fn test_extract_rate_from_table() {
        assert_eq!(extract_usd_rate_from_html(NRB_TABLE), Some(136.42));
    }

    #[test]
    fn test_extract_rate_npr_first_format() {
        assert_eq!(extract_usd_rate("1 dollar = 134.10 NPR per USD"), Some(134.10));
    }

    #[test]
    fn test_extract_rate_us_dollar_format() {
        assert_eq!(extract_usd_rate("us dollar buying 133.90 selling 134.50"), Some(133.90));
    }

    #[test]
    fn test_out_of_band_match_is_rejected() {
        // First match after USD is 250.00, the next one is plausible
        assert_eq!(extract_usd_rate("USD 250.00 then USD 135.55"), Some(135.55));
        assert_eq!(extract_usd_rate("USD 250.00 and USD 099.10"), None);
    }

    #[test]
    fn test_no_rate_on_page() {
        assert_eq!(extract_usd_rate_from_html("<html><body>Maintenance</body></html>"), None);
    }

    #[test]
    fn test_page_text_joins_nodes() {
        let text = page_text("<p>USD</p><p>1</p><p>133.20</p>");
        assert_eq!(text, "USD 1 133.20");
    }
}
