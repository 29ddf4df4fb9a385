use crate::core::*;
use crate::handler::ent::HealthReport;
use chrono::{TimeZone, Utc};
use std::fmt::Write;

struct Badge {
    class: &'static str,
    label: &'static str,
}

fn overall_badge(overall: OverallStatus) -> (Badge, &'static str) {
    match overall {
        OverallStatus::Operational => (
            Badge {
                class: "green",
                label: "All Systems Operational",
            },
            "&#10003;",
        ),
        OverallStatus::Degraded => (
            Badge {
                class: "yellow",
                label: "Partial System Outage",
            },
            "!",
        ),
        OverallStatus::Outage => (
            Badge {
                class: "red",
                label: "Major System Outage",
            },
            "&#10005;",
        ),
    }
}

fn service_badge(status: ServiceStatus) -> Badge {
    match status {
        ServiceStatus::Up => Badge {
            class: "green",
            label: "Operational",
        },
        ServiceStatus::Down => Badge {
            class: "red",
            label: "Outage",
        },
        ServiceStatus::Unknown => Badge {
            class: "yellow",
            label: "Unknown",
        },
    }
}

fn dependency_badge(status: DependencyStatus) -> Badge {
    match status {
        DependencyStatus::Up => Badge {
            class: "green",
            label: "Operational",
        },
        DependencyStatus::Degraded => Badge {
            class: "yellow",
            label: "Degraded",
        },
        DependencyStatus::Down => Badge {
            class: "red",
            label: "Outage",
        },
    }
}

fn role_label(role: NodeRole) -> &'static str {
    match role {
        NodeRole::Primary => "PRIMARY",
        NodeRole::Secondary => "SECONDARY",
        NodeRole::Arbiter => "ARBITER",
        NodeRole::Unknown => "UNKNOWN",
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{margin:0;font-family:system-ui,sans-serif;background:#f8fafc;color:#0f172a}\
main{max-width:48rem;margin:0 auto;padding:2rem 1rem}\
.banner{display:flex;gap:1rem;align-items:center;padding:1.5rem;border-radius:.5rem}\
.banner.green{background:#dcfce7}.banner.yellow{background:#fef9c3}.banner.red{background:#fee2e2}\
.card{background:#fff;border:1px solid #e2e8f0;border-radius:.5rem;padding:1rem;margin-top:.75rem}\
.dot{display:inline-block;width:.6rem;height:.6rem;border-radius:50%}\
.dot.green{background:#22c55e}.dot.yellow{background:#eab308}.dot.red{background:#ef4444}\
.nodes{display:grid;grid-template-columns:repeat(3,1fr);gap:.5rem;margin-top:.75rem}\
.muted{color:#64748b;font-size:.85rem}.error{border-color:#fecaca;background:#fef2f2}";

fn render_dependency(out: &mut String, dependency: &DependencyHealth) {
    let badge = dependency_badge(dependency.status);
    let _ = write!(
        out,
        "<div class=\"card\"><span class=\"dot {}\"></span> <strong>{}</strong> <span class=\"muted\">{}</span>",
        badge.class,
        escape(&dependency.kind),
        badge.label
    );
    if let Some(nodes) = &dependency.cluster_detail {
        let mut nodes: Vec<&ClusterNodeHealth> = nodes.iter().collect();
        nodes.sort_by_key(|node| node.role);
        out.push_str("<div class=\"nodes\">");
        for node in nodes {
            let _ = write!(
                out,
                "<div class=\"node\"><span class=\"dot {}\"></span> {}</div>",
                if node.healthy { "green" } else { "red" },
                role_label(node.role)
            );
        }
        out.push_str("</div>");
    }
    out.push_str("</div>");
}

fn render_service(out: &mut String, service: &ServiceHealth, endpoint: Option<&str>) {
    let badge = service_badge(service.status);
    let _ = write!(
        out,
        "<div class=\"card service\"><span class=\"dot {}\"></span> <strong>{}</strong>",
        badge.class,
        escape(&service.name)
    );
    if let Some(version) = &service.version {
        let _ = write!(out, " <span class=\"muted\">v{}</span>", escape(version));
    }
    let _ = write!(out, " <span class=\"badge\">{}</span>", badge.label);
    if let Some(ms) = service.response_time_ms {
        let _ = write!(out, " <span class=\"muted\">{}ms</span>", ms);
    }
    if let Some(dependencies) = service.dependencies.as_ref().filter(|d| !d.is_empty()) {
        out.push_str("<h4>Dependencies</h4>");
        for dependency in dependencies {
            render_dependency(out, dependency);
        }
    }
    out.push_str("</div>");

    if let Some(error) = &service.error {
        let _ = write!(
            out,
            "<div class=\"card error\"><h3>Error Details</h3><p>{}</p>",
            escape(error)
        );
        if let Some(endpoint) = endpoint.filter(|_| service.source_url.is_some()) {
            let _ = write!(out, "<p class=\"muted\">Endpoint: {}</p>", escape(endpoint));
        }
        out.push_str("</div>");
    }
}

/// Renders the human-facing status page for `report`. `last_updated` is the
/// epoch millis of the last cached upstream reading, if any; `endpoint` is the
/// full URL that was probed, shown next to errors.
pub fn render(report: &HealthReport, last_updated: Option<u64>, endpoint: Option<&str>) -> String {
    let (banner, icon) = overall_badge(report.overall);
    let last_updated = last_updated
        .and_then(|millis| Utc.timestamp_millis_opt(millis as i64).single())
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>Status - {name}</title><style>{style}</style></head><body><main>\
<h2>{name} Status</h2>\
<div class=\"banner {class}\"><span class=\"icon\">{icon}</span><div><h1>{label}</h1>\
<p class=\"muted\">Checked at {checked} &middot; last upstream reading {last_updated}</p></div></div>\
<h2>Services</h2>",
        name = escape(&report.pixel.name),
        style = STYLE,
        class = banner.class,
        icon = icon,
        label = banner.label,
        checked = escape(&report.timestamp),
        last_updated = last_updated,
    );
    for service in &report.services {
        render_service(&mut out, service, endpoint);
    }
    let _ = write!(
        out,
        "<footer class=\"muted\">Powered by {} v{} &middot; <a href=\"/api/health\">JSON</a></footer>\
</main></body></html>",
        escape(&report.pixel.name),
        escape(&report.pixel.version)
    );
    out
}
