use std::path::PathBuf;

use leasing_core::control::{
    ControlError, LeasingControlPlane, LeasingEmailRequest, ProspectCriteria,
};
use leasing_core::services::{RegistryConfig, SchemaRegistry};
use surrealdb::engine::local::Db;

async fn control_plane() -> LeasingControlPlane<Db> {
    let data_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data");
    let registry = SchemaRegistry::in_memory(&RegistryConfig::new(data_dir))
        .await
        .unwrap_or_else(|err| panic!("failed to build registry: {err}"));
    LeasingControlPlane::new(registry)
}

#[tokio::test]
async fn guest_card_summary_reports_budget_and_breakdowns() {
    let report = control_plane()
        .await
        .guest_card_summary()
        .expect("summary should render");

    assert!(report.contains("| Total Inquiries | 7 |"));
    assert!(report.contains("| Avg Max Rent Budget | $2,508 |"));
    assert!(report.contains("| Avg Monthly Income | $8,133 |"));
    assert!(report.contains("| Budget Range | $2,300 - $2,800 |"));
    assert!(report.contains(
        "| pet_type | count |\n| --- | --- |\n| Cats | 2 |\n| Dogs | 2 |\n| No Pets | 2 |\n| Other | 1 |\n"
    ));
    assert!(report.contains("| Email Received | 3 |"));
    assert!(report.contains("| 720 to 799 | 1 |"));
}

#[tokio::test]
async fn qualified_prospects_apply_income_credit_and_status() {
    let control = control_plane().await;
    let report = control
        .qualified_prospects(&ProspectCriteria::default())
        .expect("prospects should render");

    assert!(report.contains("### Results: 3 of 7 prospects qualify (42.9%)"));
    let okafor = report.find("Okafor, Ada").expect("highest income listed");
    let martinez = report.find("Martinez, Sofia").expect("second listed");
    let garcia = report.find("Garcia, Luz").expect("third listed");
    assert!(okafor < martinez && martinez < garcia);
    assert!(!report.contains("Smith, Jo"), "inactive prospects are excluded");
    assert!(!report.contains("Lee, Min"), "low credit is excluded");

    let strict = control
        .qualified_prospects(&ProspectCriteria {
            min_income: 20_000.0,
            ..ProspectCriteria::default()
        })
        .expect("prospects should render");
    assert!(strict.contains("### Results: 0 of 7 prospects qualify (0.0%)"));
    assert!(strict.contains("No prospects match these criteria."));

    let invalid = control.qualified_prospects(&ProspectCriteria {
        min_credit: "good".to_string(),
        ..ProspectCriteria::default()
    });
    assert!(matches!(invalid, Err(ControlError::InvalidArgument(_))));
}

#[tokio::test]
async fn market_rent_analysis_computes_position() {
    let report = control_plane()
        .await
        .market_rent_analysis()
        .expect("analysis should render");

    assert!(report.contains("| Total Comparable Listings | 5 |"));
    assert!(report.contains("| Average Market Rent | $2,550 |"));
    assert!(report.contains("| Rent Range | $2,200 - $2,950 |"));
    assert!(report.contains("| Average Sqft | 911 |"));
    assert!(report.contains("| Average Similarity | 88.0% |"));
    assert!(report.contains(
        "| Under $2,300 | 1 |\n| $2,300 - $2,499 | 1 |\n| $2,500 - $2,699 | 1 |\n| $2,900+ | 1 |\n"
    ));
    assert!(report.contains(
        "| Below Our Price | 1 | $2,200 |\n| Same as Our Price | 2 | $2,400 |\n| Above Our Price | 2 | $2,800 |\n"
    ));
    assert!(report.contains("positioned **below** the market average of $2,550."));
}

#[tokio::test]
async fn leasing_email_combines_inputs_with_table_figures() {
    let report = control_plane()
        .await
        .generate_leasing_email(&LeasingEmailRequest::default())
        .expect("email context should render");

    assert!(report.contains("- To: Chi\n- From: Shanna"));
    assert!(report.contains("- Rate Change: Decreased by $100"));
    assert!(report.contains("- Market Average: $2,550"));
    assert!(report.contains("- Market Position: $150 below market average"));
    assert!(report.contains("- Total Inquiries: 7\n- New This Week: ~1"));
    assert!(report.contains("- Active Prospects: 6"));
    assert!(report.contains("- Engaged (responded to emails): 3"));
    assert!(report.contains("- Pre-qualification Forms Submitted: 1"));
    assert!(report.contains("- Income Qualified (3x rent = $7,200+): 6"));
    assert!(report.contains("- Can Afford $2,400 Rent: 5"));
    assert!(report.contains("- Good Credit (720+): 4"));
    assert!(report.contains("- Have Dogs: 2\n- Have Cats: 2"));
    assert!(report.contains("- Total to Date: 2"));
    assert!(report.ends_with("- End with clear next steps"));
}

#[tokio::test]
async fn query_database_guards_and_renders() {
    let control = control_plane().await;

    let rendered = control
        .query_database("SELECT Name, Monthly_Income_Amount FROM guest_cards WHERE Monthly_Income_Amount >= 10000")
        .await
        .expect("read query should run");
    let lines: Vec<&str> = rendered.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "| Name | Monthly_Income_Amount |");
    assert!(lines[2].contains("| Okafor, Ada |"));

    let empty = control
        .query_database("SELECT * FROM guest_cards WHERE Monthly_Income_Amount > 1000000;")
        .await
        .expect("empty result is not an error");
    assert_eq!(empty, "No results found.");

    let rejected = control
        .query_database("DELETE guest_cards")
        .await
        .expect_err("mutation must be rejected");
    assert_eq!(rejected.to_string(), "Error: Only SELECT queries are allowed.");

    let failed = control
        .query_database("SELECT FROM WHERE")
        .await
        .expect_err("invalid statement must fail");
    assert!(matches!(failed, ControlError::QueryFailed(_)));
    assert_eq!(control.registry().row_count("guest_cards"), Some(7));
}
