//! CLI display utilities for formatting output

use crate::plugin::api::PluginDescriptor;
use prettytable::{format, Cell, Row, Table};
use std::path::PathBuf;

const HEADER_STYLE: &str = "Fy";
const OK_STYLE: &str = "Fg";
const FAILED_STYLE: &str = "Fr";

fn header(titles: &[&str]) -> Row {
    Row::new(
        titles
            .iter()
            .map(|title| Cell::new(title).style_spec(HEADER_STYLE))
            .collect(),
    )
}

fn new_table() -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table
}

/// Table of manifest entries
pub fn plugin_table(descriptors: &[PluginDescriptor]) -> Table {
    let mut table = new_table();
    table.set_titles(header(&["Plugin", "Id", "Version", "Path", "Description"]));
    for descriptor in descriptors {
        table.add_row(Row::new(vec![
            Cell::new(&descriptor.label()),
            Cell::new(&descriptor.id),
            Cell::new(&descriptor.version),
            Cell::new(&descriptor.path.display().to_string()),
            Cell::new(&descriptor.description),
        ]));
    }
    table
}

/// Table of `load` outcomes, one row per requested path
pub fn load_report_table(results: &[(PathBuf, bool)]) -> Table {
    let mut table = new_table();
    table.set_titles(header(&["Path", "Result"]));
    for (path, ok) in results {
        let (text, style) = if *ok {
            ("loaded", OK_STYLE)
        } else {
            ("failed", FAILED_STYLE)
        };
        table.add_row(Row::new(vec![
            Cell::new(&path.display().to_string()),
            Cell::new(text).style_spec(style),
        ]));
    }
    table
}

fn print_table(table: &Table, use_color: bool) {
    if use_color {
        let _ = table.print_tty(true);
    } else {
        print!("{}", table);
    }
}

pub fn display_plugin_table(descriptors: &[PluginDescriptor], use_color: bool) {
    if descriptors.is_empty() {
        eprintln!("No enabled plugins in manifest.");
        return;
    }
    print_table(&plugin_table(descriptors), use_color);
}

pub fn display_load_report(results: &[(PathBuf, bool)], use_color: bool) {
    if results.is_empty() {
        eprintln!("No plugins requested.");
        return;
    }
    print_table(&load_report_table(results), use_color);
}
