//! Human-readable descriptions of a cataloged dataset
//!
//! These functions only format catalog contents; they never read array data.
//! Callers decide where the text goes.

use crate::catalog::{Dataset, Variable};
use crate::data_source::GridSource;
use crate::errors::Result;
use crate::grid_mapping::GridMapping;
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// Lists dimensions, variables and projection info of a dataset, in file order.
pub fn describe_dataset<S: GridSource>(dataset: &Dataset<S>) -> String {
    let mut lines = Vec::new();

    lines.push("\n Global Attributes".to_string());
    lines.push("=====================".to_string());
    attribute_lines(&mut lines, dataset.global_attributes(), "    ");

    lines.push("\n Dimensions".to_string());
    lines.push("==============".to_string());
    if dataset.list_dimensions().is_empty() {
        lines.push("   (No dimensions found)".to_string());
    }
    for dim in dataset.list_dimensions() {
        let length_info = if dim.is_unlimited {
            format!("{} (unlimited)", dim.length)
        } else {
            dim.length.to_string()
        };
        let coords = match dim.coordinates() {
            Some(c) if !c.is_empty() => format!("  [{} .. {}]", c[0], c[c.len() - 1]),
            Some(_) => String::new(),
            None => "  (no coordinate variable)".to_string(),
        };
        lines.push(format!("    {} = {}{}", dim.name, length_info, coords));
    }

    lines.push("\n Variables".to_string());
    lines.push("=============".to_string());
    if dataset.list_variables().is_empty() {
        lines.push("   (No variables found)".to_string());
    }
    for var in dataset.list_variables() {
        if var.dimensions.is_empty() {
            lines.push(format!("    {} ({}): scalar", var.name, var.kind));
        } else {
            lines.push(format!(
                "    {} ({}): [{}] = ({})",
                var.name,
                var.kind,
                var.dimensions.join(", "),
                join_shape(&var.shape)
            ));
        }

        let mut key_attrs = Vec::new();
        if let Some(units) = &var.units {
            key_attrs.push(format!("units: {}", units));
        }
        if let Some(long_name) = &var.long_name {
            key_attrs.push(format!("long_name: {}", long_name));
        }
        if let Some(fill) = var.no_data {
            key_attrs.push(format!("no-data: {}", fill));
        }
        if let Some(p) = var.packing {
            key_attrs.push(format!("packed: x{} + {}", p.scale_factor, p.add_offset));
        }
        if !key_attrs.is_empty() {
            lines.push(format!("      └─ {}", key_attrs.join(", ")));
        }
    }

    // One block per mapping variable, listing the data variables using it
    let mut mappings: Vec<(GridMapping, Vec<&str>)> = Vec::new();
    for var in dataset.data_variables().filter(|v| v.ndim() >= 2) {
        let Some(mapping) = dataset.grid_mapping(var) else {
            continue;
        };
        match mappings.iter_mut().find(|(m, _)| m.variable == mapping.variable) {
            Some((_, users)) => users.push(var.name.as_str()),
            None => mappings.push((mapping, vec![var.name.as_str()])),
        }
    }
    for (mapping, users) in mappings {
        lines.push(format!("\n Projection Information ({})", mapping.variable));
        lines.push(format!("={}", "=".repeat(mapping.variable.len() + 25)));
        lines.push(format!("    Used by: {}", users.join(", ")));
        lines.push(format!(
            "    Mapping: {}",
            mapping.mapping_name.as_deref().unwrap_or("unnamed")
        ));
        if let Some(code) = mapping.epsg() {
            lines.push(format!("    EPSG:{}", code));
        }
        if let Some(proj) = mapping.proj_string() {
            lines.push(format!("    PROJ: {}", proj));
        }
        lines.push("    Attributes:".to_string());
        attribute_lines(&mut lines, &mapping.attributes, "      ");
    }

    finish(lines)
}

/// Describes one variable: type, shape, dimension details, attributes and
/// storage size.
pub fn describe_variable<S: GridSource>(dataset: &Dataset<S>, var_name: &str) -> Result<String> {
    let var = dataset.variable(var_name)?;
    let mut lines = Vec::new();

    lines.push(format!("\n Variable Description: {}", var_name));
    lines.push(format!("={}", "=".repeat(var_name.len() + 25)));
    lines.push(format!(" Data type: {}", var.kind));

    if var.dimensions.is_empty() {
        lines.push(" Dimensions: (scalar)".to_string());
        lines.push(" Shape: ()".to_string());
    } else {
        lines.push(format!(" Dimensions: [{}]", var.dimensions.join(", ")));
        lines.push(format!(" Shape: ({})", join_shape(&var.shape)));

        lines.push("\n Dimension Details:".to_string());
        for name in &var.dimensions {
            let dim = dataset.dimension(name)?;
            let length_info = if dim.is_unlimited {
                format!("{} (unlimited)", dim.length)
            } else {
                dim.length.to_string()
            };
            lines.push(format!("    {} = {}", dim.name, length_info));
        }

        if let Some((x, y)) = dataset.suggest_display_axes(var) {
            lines.push(format!("\n Suggested display axes: x = {}, y = {}", x, y));
        }
    }

    if var.attributes.is_empty() {
        lines.push("\n  Attributes: (none)".to_string());
    } else {
        lines.push("\n  Attributes:".to_string());
        attribute_lines(&mut lines, &var.attributes, "   • ");
    }

    lines.push("\n Storage Information:".to_string());
    lines.push(format!("    Total elements: {}", var.total_elements()));
    lines.push(format!("    Element size: {} bytes", var.kind.size_bytes()));
    lines.push(format!("    Total size: {}", format_size(var.estimated_size_bytes())));

    Ok(finish(lines))
}

/// Byte count in the largest unit that keeps the value above one
pub fn format_size(total_bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let bytes = total_bytes as f64;
    if total_bytes < 1024 {
        format!("{} bytes", total_bytes)
    } else if bytes < KB * KB {
        format!("{:.2} KB", bytes / KB)
    } else if bytes < KB * KB * KB {
        format!("{:.2} MB", bytes / (KB * KB))
    } else {
        format!("{:.2} GB", bytes / (KB * KB * KB))
    }
}

fn finish(lines: Vec<String>) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn join_shape(shape: &[usize]) -> String {
    shape
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" × ")
}

/// Attributes have no stored order, so they are listed by name
fn attribute_lines(lines: &mut Vec<String>, attributes: &HashMap<String, JsonValue>, prefix: &str) {
    if attributes.is_empty() {
        lines.push(format!("{}(none)", prefix));
        return;
    }
    let mut names: Vec<_> = attributes.keys().collect();
    names.sort();
    for name in names {
        match &attributes[name] {
            JsonValue::String(s) => lines.push(format!("{}{}: \"{}\"", prefix, name, s)),
            other => lines.push(format!("{}{}: {}", prefix, name, other)),
        }
    }
}

/// Variables worth offering for display: data variables with two or more
/// dimensions.
pub fn displayable_variables<S: GridSource>(dataset: &Dataset<S>) -> Vec<&Variable> {
    dataset.data_variables().filter(|v| v.ndim() >= 2).collect()
}
