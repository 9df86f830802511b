//! Field-by-field parsing of the model's company profile JSON.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde_json::{Map, Value};

use firmscope_shared::{CompanyProfile, Executive, LinkedInProfile, MAX_PROFILE_EXECUTIVES, NewsItem};

use crate::lenient::{field, scalar_text, text_field};

const NAME: &[&str] = &["name", "companyname"];
const LOCATION: &[&str] = &["location", "headquarters", "hq", "headquarterslocation"];
const INDUSTRY: &[&str] = &["industry", "sector"];
const WEBSITE: &[&str] = &["website", "companywebsite", "url"];
const LINKEDIN: &[&str] = &["linkedin", "linkedinurl", "linkedinprofile", "linkedinpage"];
const EMAIL: &[&str] = &["email", "contactemail"];
const FOUNDED: &[&str] = &["foundedyear", "founded", "yearfounded"];
const STOCK_PRICE: &[&str] = &["stockprice", "stockpriceifavailable", "shareprice"];
const EMPLOYEES: &[&str] = &["numberofemployees", "employees", "employeecount", "headcount"];
const REVENUE: &[&str] = &["revenue", "annualrevenue"];
const EXECUTIVES: &[&str] = &["topexecutives", "executives", "leadership", "keyexecutives"];
const NEWS: &[&str] = &["latestnews", "news", "recentnews"];

const EXEC_NAME: &[&str] = &["name", "fullname"];
const EXEC_TITLE: &[&str] = &["position", "title", "role"];
const EXEC_LINKEDIN: &[&str] = &["linkedin", "linkedinurl", "linkedinprofile"];
const EXEC_EMAIL: &[&str] = &["email"];

const NEWS_TITLE: &[&str] = &["title", "headline"];
const NEWS_DATE: &[&str] = &["date", "publisheddate", "published", "publishedat"];
const NEWS_SUMMARY: &[&str] = &["summary", "detailedsummary", "description"];

/// Earliest founding year accepted as plausible.
const MIN_FOUNDED_YEAR: u16 = 1600;

/// Parse fence-stripped model output into a profile.
///
/// Anything but a JSON object is rejected. Individual fields that fail
/// validation are left absent; list items that fail are dropped.
pub(crate) fn parse_profile(cleaned: &str) -> Result<CompanyProfile, String> {
    let value: Value = serde_json::from_str(cleaned).map_err(|e| e.to_string())?;
    let Value::Object(root) = value else {
        return Err("profile is not a JSON object".into());
    };
    let obj = unwrap_envelope(&root);

    Ok(CompanyProfile {
        name: text_field(obj, NAME),
        location: text_field(obj, LOCATION),
        industry: text_field(obj, INDUSTRY),
        website: text_field(obj, WEBSITE),
        linkedin: text_field(obj, LINKEDIN),
        email: text_field(obj, EMAIL),
        founded_year: field(obj, FOUNDED).and_then(founded_year),
        stock_price: text_field(obj, STOCK_PRICE),
        employee_count: text_field(obj, EMPLOYEES),
        revenue: text_field(obj, REVENUE),
        executives: field(obj, EXECUTIVES)
            .and_then(Value::as_array)
            .map(|items| parse_executives(items))
            .unwrap_or_default(),
        news: field(obj, NEWS)
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(parse_news_item).collect())
            .unwrap_or_default(),
    })
}

/// Models sometimes nest the whole profile under one key
/// (`{"company_profile": {...}}`). Unwrap that single level.
fn unwrap_envelope(root: &Map<String, Value>) -> &Map<String, Value> {
    let known = [NAME, INDUSTRY, EXECUTIVES, NEWS]
        .iter()
        .any(|aliases| field(root, aliases).is_some());
    if known || root.len() != 1 {
        return root;
    }
    match root.values().next() {
        Some(Value::Object(inner)) => inner,
        _ => root,
    }
}

/// A plausible four-digit year from a number or from text like "Founded in 1987".
fn founded_year(value: &Value) -> Option<u16> {
    static YEAR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\b(\d{4})\b").expect("year regex"));

    let candidate: u16 = match value {
        Value::Number(n) => u16::try_from(n.as_u64()?).ok()?,
        Value::String(s) => YEAR_RE.captures(s)?.get(1)?.as_str().parse().ok()?,
        _ => return None,
    };

    let current = u16::try_from(chrono::Utc::now().year()).ok()?;
    (MIN_FOUNDED_YEAR..=current).contains(&candidate).then_some(candidate)
}

fn parse_executives(items: &[Value]) -> Vec<Executive> {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let name = text_field(obj, EXEC_NAME)?;
            let title = text_field(obj, EXEC_TITLE)?;
            let linkedin = match text_field(obj, EXEC_LINKEDIN) {
                Some(url) if url.contains("linkedin.com/") => LinkedInProfile::Found(url),
                _ => LinkedInProfile::NotFound,
            };
            Some(Executive {
                name,
                title,
                linkedin,
                email: text_field(obj, EXEC_EMAIL).filter(|e| e.contains('@')),
            })
        })
        .take(MAX_PROFILE_EXECUTIVES)
        .collect()
}

fn parse_news_item(value: &Value) -> Option<NewsItem> {
    let item = match value {
        Value::Object(obj) => NewsItem {
            title: text_field(obj, NEWS_TITLE),
            date: text_field(obj, NEWS_DATE),
            summary: text_field(obj, NEWS_SUMMARY),
            sentiment: None,
        },
        Value::String(_) => NewsItem {
            summary: scalar_text(value),
            ..NewsItem::default()
        },
        _ => return None,
    };
    (item != NewsItem::default()).then_some(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_title_case_profile() {
        let raw = json!({
            "Name": "Acme Corp",
            "Location": "Springfield, USA",
            "Industry": "Industrial Robotics",
            "Website": "https://acme.com",
            "LinkedIn": "https://www.linkedin.com/company/acme",
            "Email": "N/A",
            "Founded Year": "Founded in 1987",
            "Stock Price (if available)": "Not available",
            "Number of Employees": 1200,
            "Revenue": "$340M",
            "Top Executives": [
                {"Name": "Jane Doe", "Position": "CEO", "LinkedIn": "https://www.linkedin.com/in/janedoe", "Email": "jane@acme.com"},
                {"Name": "John Roe", "Position": "CFO", "LinkedIn": "Not found"}
            ],
            "Latest News": [
                {"Title": "Acme raises Series D", "Date": "2026-03-02", "Summary": "Acme closed a $120M round."},
                {"Title": "Acme at the trade fair"}
            ]
        })
        .to_string();

        let profile = parse_profile(&raw).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Acme Corp"));
        assert_eq!(profile.email, None);
        assert_eq!(profile.founded_year, Some(1987));
        assert_eq!(profile.stock_price, None);
        assert_eq!(profile.employee_count.as_deref(), Some("1200"));
        assert_eq!(profile.executives.len(), 2);
        assert_eq!(profile.executives[0].title, "CEO");
        assert_eq!(profile.executives[0].email.as_deref(), Some("jane@acme.com"));
        assert_eq!(profile.executives[1].linkedin, LinkedInProfile::NotFound);
        assert_eq!(profile.news.len(), 2);
        assert!(profile.news[1].summary.is_none());
        assert!(profile.news.iter().all(|n| n.sentiment.is_none()));
    }

    #[test]
    fn snake_case_and_envelope_are_accepted() {
        let raw = json!({
            "company_profile": {
                "company_name": "Acme Corp",
                "founded_year": 1987,
                "news": ["Acme opened a second factory in Ohio."]
            }
        })
        .to_string();
        let profile = parse_profile(&raw).unwrap();
        assert_eq!(profile.name.as_deref(), Some("Acme Corp"));
        assert_eq!(profile.founded_year, Some(1987));
        assert_eq!(
            profile.news[0].summary.as_deref(),
            Some("Acme opened a second factory in Ohio.")
        );
    }

    #[test]
    fn implausible_years_are_absent() {
        for year in [json!(87), json!("3021"), json!(1200), json!("about a century ago")] {
            assert_eq!(founded_year(&year), None, "{year}");
        }
        assert_eq!(founded_year(&json!("est. 1999")), Some(1999));
    }

    #[test]
    fn executives_are_capped_and_validated() {
        let execs: Vec<Value> = (0..9)
            .map(|i| json!({"name": format!("Exec {i}"), "position": "VP"}))
            .chain([json!({"name": "No Title"}), json!({"position": "Nameless"}), json!("text")])
            .collect();
        let raw = json!({"Name": "Acme", "Top Executives": execs}).to_string();

        let profile = parse_profile(&raw).unwrap();
        assert_eq!(profile.executives.len(), MAX_PROFILE_EXECUTIVES);
        assert_eq!(profile.executives[5].name, "Exec 5");
    }

    #[test]
    fn non_objects_are_rejected() {
        assert!(parse_profile("[1, 2, 3]").is_err());
        assert!(parse_profile("\"Acme\"").is_err());
        assert!(parse_profile("not json at all").is_err());
    }

    #[test]
    fn identical_input_yields_identical_profile() {
        let raw = json!({"Name": "Acme", "Industry": "Robotics", "Revenue": "$1B"}).to_string();
        assert_eq!(parse_profile(&raw).unwrap(), parse_profile(&raw).unwrap());
    }
}
