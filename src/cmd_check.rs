//! `tether check`: show what a cron expression expands to.

use tether_cron::{CronSchedule, FieldKind};

/// Parse `expr` and print its expanded field sets.
pub(crate) fn handle_check_command(expr: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let schedule = CronSchedule::parse(expr)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&schedule_json(expr, &schedule))?);
        return Ok(());
    }

    println!("Expression: {}", expr.trim());
    for kind in FieldKind::ALL {
        println!("{:<8} {}", kind.name(), format_values(&schedule.field(kind).values()));
    }
    if schedule.is_never() {
        println!("Warning: a field allows no values, this expression never fires");
    }

    Ok(())
}

fn schedule_json(expr: &str, schedule: &CronSchedule) -> serde_json::Value {
    let mut fields = serde_json::Map::new();
    for kind in FieldKind::ALL {
        fields.insert(kind.name().to_string(), serde_json::json!(schedule.field(kind).values()));
    }
    serde_json::json!({
        "expression": expr.trim(),
        "fields": fields,
        "never": schedule.is_never(),
    })
}

fn format_values(values: &[u32]) -> String {
    if values.is_empty() {
        return "(none)".to_string();
    }
    values.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}
