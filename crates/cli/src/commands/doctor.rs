use deskbot_core::config::{AppConfig, LoadOptions};
use deskbot_core::KnowledgeBase;
use serde::Serialize;

use crate::commands::CommandResult;

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

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report(AppConfig::load(LoadOptions::default()));
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report<E: std::fmt::Display>(loaded: Result<AppConfig, E>) -> DoctorReport {
    let mut checks = Vec::new();

    match loaded {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_knowledge_base(&config));
            checks.push(check_llm_readiness(&config));
            checks.push(check_notifier_readiness(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["knowledge_base", "llm_readiness", "notifier_readiness"] {
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

fn check_knowledge_base(config: &AppConfig) -> DoctorCheck {
    match KnowledgeBase::load(&config.knowledge) {
        Ok(knowledge) if knowledge.is_empty() => DoctorCheck {
            name: "knowledge_base",
            status: CheckStatus::Fail,
            details: format!(
                "`{}` contains no FAQ entries; every message will reach the model",
                config.knowledge.faq_path.display()
            ),
        },
        Ok(knowledge) => DoctorCheck {
            name: "knowledge_base",
            status: CheckStatus::Pass,
            details: format!(
                "loaded {} entries from `{}` ({} similarity, threshold {})",
                knowledge.len(),
                config.knowledge.faq_path.display(),
                knowledge.strategy_name(),
                config.knowledge.confidence_threshold
            ),
        },
        Err(error) => {
            DoctorCheck { name: "knowledge_base", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_llm_readiness(config: &AppConfig) -> DoctorCheck {
    if config.llm.is_configured() {
        DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Pass,
            details: format!("api key present for `{}` at {}", config.llm.model, config.llm.base_url),
        }
    } else {
        DoctorCheck {
            name: "llm_readiness",
            status: CheckStatus::Fail,
            details: "DESKBOT_LLM_API_KEY is not set; non-FAQ messages will escalate".to_string(),
        }
    }
}

fn check_notifier_readiness(config: &AppConfig) -> DoctorCheck {
    let escalation = &config.escalation;
    let mut missing = Vec::new();
    if escalation.recipient().is_none() {
        missing.push("support_email");
    }
    if !escalation.transport_configured() {
        missing.push("smtp_host/smtp_username/smtp_password");
    }

    if missing.is_empty() {
        DoctorCheck {
            name: "notifier_readiness",
            status: CheckStatus::Pass,
            details: format!(
                "escalations go to {} via {}:{}",
                escalation.recipient().unwrap_or_default(),
                escalation.smtp_host.as_deref().unwrap_or_default(),
                escalation.smtp_port
            ),
        }
    } else {
        DoctorCheck {
            name: "notifier_readiness",
            status: CheckStatus::Fail,
            details: format!("missing {}", missing.join(", ")),
        }
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
