//! `map`, `show`, `set` and `orders`: everything that touches order records.

use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use bendline_catalog::catalog_image_path;
use bendline_core::MappingResult;
use bendline_store::{OrderLine, OrderRecord};

use crate::context::AppContext;
use crate::terminal_output::{
    attention, note_error, note_info, note_success, note_warn, render_table, Column,
};

pub struct MapArgs<'a> {
    pub order: &'a str,
    pub page: u32,
    pub line: u32,
    pub shape: &'a str,
    pub order_image: &'a Path,
}

pub async fn map(ctx: &AppContext, args: MapArgs<'_>) -> Result<()> {
    let catalog = ctx.load_catalog().await?;
    let shape = catalog.get(args.shape)?;
    let catalog_image = catalog_image_path(&ctx.catalog_images_dir(), shape);
    let mapper = ctx.mapper()?;
    let store = ctx.open_store().await?;

    info!(
        order = %args.order,
        page = args.page,
        line = args.line,
        shape = %shape.number,
        "Mapping order line"
    );
    let result = mapper
        .map_catalog_to_order(
            &shape.number,
            &catalog_image,
            args.order_image,
            &shape.letter_list(),
        )
        .await?;

    if let Some(error) = &result.error {
        note_error(&format!("Vision provider failed: {error}"));
        bail!("mapping failed, order {} left unchanged", args.order);
    }
    report_issues(&result);

    let record = store
        .merge_mapping(args.order, args.page, args.line, shape, &result)
        .await?;
    if let Some(line) = record.line(args.page, args.line) {
        print!("{}", line_table(line));
        for (letter, reading) in &line.conflicts {
            note_warn(&format!(
                "{letter}: reviewed value kept, model read {reading} (use `set` to settle)"
            ));
        }
    }
    note_success(&format!(
        "Merged shape {} into order {} page {} line {}",
        shape.number, args.order, args.page, args.line
    ));
    Ok(())
}

fn report_issues(result: &MappingResult) {
    for issue in &result.issues {
        if issue.is_violation() {
            note_warn(&issue.to_string());
        } else {
            note_info(&issue.to_string());
        }
    }
}

pub async fn show(ctx: &AppContext, order: &str, json: bool) -> Result<()> {
    let store = ctx.open_store().await?;
    let record = store.load(order).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print!("{}", record_summary(&record));
    }
    Ok(())
}

pub async fn set(
    ctx: &AppContext,
    order: &str,
    page: u32,
    line: u32,
    letter: &str,
    value: Option<f64>,
) -> Result<()> {
    let store = ctx.open_store().await?;
    let record = store.set_value(order, page, line, letter, value).await?;
    if let Some(line) = record.line(page, line) {
        print!("{}", line_table(line));
    }
    note_success(&format!("Updated {letter} on order {order} page {page} line {line}"));
    Ok(())
}

pub async fn list(ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store().await?;
    let ids = store.list().await?;
    if ids.is_empty() {
        note_info(&format!("No orders in {}", store.root().display()));
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => attention("?"),
    }
}

fn line_table(line: &OrderLine) -> String {
    let rows: Vec<Vec<String>> = line
        .values
        .iter()
        .map(|(letter, value)| {
            vec![
                letter.clone(),
                format_value(*value),
                line.confidence
                    .get(letter)
                    .map(|c| format!("{c:.2}"))
                    .unwrap_or_default(),
            ]
        })
        .collect();
    render_table(
        &[
            Column::left("Letter"),
            Column::right("Value"),
            Column::right("Conf"),
        ],
        &rows,
    )
}

fn record_summary(record: &OrderRecord) -> String {
    let mut out = format!("Order {}", record.order_id);
    if let Some(customer) = &record.customer {
        out.push_str(&format!(" ({customer})"));
    }
    out.push_str(&format!(
        ", {} line(s), updated {}\n",
        record.line_count(),
        record.updated_at.format("%Y-%m-%d %H:%M")
    ));

    let mut rows = Vec::new();
    for (page, lines) in &record.pages {
        for (key, line) in lines {
            let values = line
                .values
                .iter()
                .map(|(letter, v)| format!("{letter}={}", format_value(*v)))
                .collect::<Vec<_>>()
                .join(" ");
            rows.push(vec![
                page.number().to_string(),
                key.number().to_string(),
                line.shape.clone(),
                values,
                if line.reviewed { "yes" } else { "" }.to_string(),
            ]);
        }
    }
    out.push_str(&render_table(
        &[
            Column::right("Page"),
            Column::right("Line"),
            Column::left("Shape"),
            Column::left("Values"),
            Column::left("Reviewed"),
        ],
        &rows,
    ));
    out
}
