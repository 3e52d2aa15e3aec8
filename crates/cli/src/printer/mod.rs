use anyhow::Result;

use atlas_engine::ContextSummary;

/// Render the context tree, human-readable or as JSON.
pub fn print_tree(tree: &[ContextSummary], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tree)?);
        return Ok(());
    }

    if tree.is_empty() {
        println!("(no analysis contexts)");
        return Ok(());
    }

    for context in tree {
        print_context(context, 0);
    }
    Ok(())
}

fn print_context(context: &ContextSummary, depth: usize) {
    let indent = "  ".repeat(depth);
    let descriptor = context
        .descriptor
        .as_deref()
        .and_then(|d| d.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("no descriptor");

    println!(
        "{indent}{} [{descriptor}] {} file(s)",
        context.folder.display(),
        context.source_files.len()
    );

    for child in &context.children {
        print_context(child, depth + 1);
    }
}
