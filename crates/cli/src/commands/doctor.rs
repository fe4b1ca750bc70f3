use std::path::Path;

use barista_core::catalog::Menu;
use barista_core::config::AppConfig;
use barista_core::recommendations::{AprioriTable, PopularityTable};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool, config_path: Option<&Path>) -> String {
    let report = build_report(config_path);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(config_path: Option<&Path>) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(super::load_options(config_path)) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_gemini_credentials(&config));
            checks.push(check_menu_data(&config));
            checks.push(check_apriori_data(&config));
            checks.push(check_popularity_data(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in
                ["gemini_credentials", "menu_data", "apriori_data", "popularity_data"]
            {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_gemini_credentials(config: &AppConfig) -> DoctorCheck {
    if config.has_api_key() {
        DoctorCheck {
            name: "gemini_credentials",
            status: CheckStatus::Pass,
            details: "Gemini API key configured".to_string(),
        }
    } else {
        DoctorCheck {
            name: "gemini_credentials",
            status: CheckStatus::Fail,
            details: "no Gemini API key; set BARISTA_GEMINI_API_KEY or llm.api_key in barista.toml"
                .to_string(),
        }
    }
}

fn check_menu_data(config: &AppConfig) -> DoctorCheck {
    match Menu::load(&config.data.products_path) {
        Ok(menu) => DoctorCheck {
            name: "menu_data",
            status: CheckStatus::Pass,
            details: format!(
                "{} menu items loaded from `{}`",
                menu.len(),
                config.data.products_path.display()
            ),
        },
        Err(error) => {
            DoctorCheck { name: "menu_data", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_apriori_data(config: &AppConfig) -> DoctorCheck {
    match AprioriTable::load(&config.data.apriori_path) {
        Ok(table) => DoctorCheck {
            name: "apriori_data",
            status: CheckStatus::Pass,
            details: format!(
                "co-purchase candidates for {} products loaded from `{}`",
                table.len(),
                config.data.apriori_path.display()
            ),
        },
        Err(error) => DoctorCheck {
            name: "apriori_data",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_popularity_data(config: &AppConfig) -> DoctorCheck {
    match PopularityTable::load(&config.data.popularity_path) {
        Ok(table) => DoctorCheck {
            name: "popularity_data",
            status: CheckStatus::Pass,
            details: format!(
                "{} popularity rows loaded from `{}`",
                table.len(),
                config.data.popularity_path.display()
            ),
        },
        Err(error) => DoctorCheck {
            name: "popularity_data",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
