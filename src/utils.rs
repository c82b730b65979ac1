//! Utility functions for reporting search results.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use itertools::Itertools;

use crate::error::Result;
use crate::problem::Problem;
use crate::solution::RouteSolution;
use crate::SearchReport;

/// Format a duration as hours, minutes, and seconds.
pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    format!("{}h {:02}m {:02}.{:03}s", hours, minutes, seconds, millis)
}

/// Render a route with the depot at both ends.
pub fn format_route(route: &RouteSolution, problem: &Problem) -> String {
    std::iter::once(problem.depot)
        .chain(route.stops().iter().copied())
        .chain(std::iter::once(problem.depot))
        .join(" -> ")
}

/// On-board load after each stop of the route.
pub fn load_profile(route: &RouteSolution, problem: &Problem) -> Vec<f64> {
    route
        .stops()
        .iter()
        .scan(0.0, |load, &stop| {
            *load += problem.stops[stop].load_delta();
            Some(*load)
        })
        .collect()
}

/// Save a report as pretty-printed JSON.
pub fn save_report<P: AsRef<Path>>(report: &SearchReport, path: P) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;

    Ok(())
}

/// Human-readable summary of a finished search.
pub fn format_report(report: &SearchReport, problem: &Problem) -> String {
    let mut out = format!(
        "Search Statistics:
- Instance: {}
- Runtime: {}
- Agents: {}
- Cycles: {}
- gbest proposals: {} ({} accepted)
- Best Cost: {:.2} (agent {})
- Best Route: {}
- Load Profile: [{}]",
        report.instance,
        format_duration(report.run_time),
        report.agents.len(),
        report.iterations,
        report.proposals,
        report.gbest_updates,
        report.best_cost,
        report.best_agent,
        format_route(&report.best_route, problem),
        load_profile(&report.best_route, problem)
            .iter()
            .map(|load| format!("{:.0}", load))
            .join(", "),
    );

    out.push_str("\n\nAgents:");
    for agent in &report.agents {
        out.push_str(&format!(
            "\n- #{}: pbest {:.2}, {} cycles, {} evaluations, {} intensifications, p(pbest) {:.2}",
            agent.agent_id,
            agent.pbest_cost,
            agent.iterations,
            agent.evaluations,
            agent.intensifications,
            agent.pbest_relink_probability
        ));

        for record in &agent.strategies {
            out.push_str(&format!(
                "\n    {:<8} {:>4}/{:<4} ratio {:.2}, mean gain {:.2}",
                record.name,
                record.successes,
                record.attempts,
                record.success_ratio(),
                record.average_improvement()
            ));
        }
    }

    out
}
