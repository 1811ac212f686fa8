// Colored terminal output for feed pages and classification summaries.

use std::collections::BTreeMap;

use colored::{ColoredString, Colorize};

use crate::activity::category::Category;
use crate::activity::event::{ActivityEvent, NormalizedBatch};
use crate::activity::reactions::PostReactions;
use crate::feed::composer::EmptyReason;
use crate::feed::engine::FeedView;
use crate::feed::query::Surface;

use super::truncate_chars;

/// Display one page of a feed, with its state flags.
pub fn display_feed(view: &FeedView) {
    let filter = &view.query.filter;
    println!(
        "\n{}",
        format!(
            "=== {} activity (category: {}, actor: {}) ===",
            view.query.mode.as_str(),
            filter.category.map(|c| c.label()).unwrap_or("all"),
            filter.actor_id.as_deref().unwrap_or("any"),
        )
        .bold()
    );

    if let Some(err) = &view.error {
        println!("  {} {}", "!!".red().bold(), err);
        println!("  {}", "Run the command again to retry.".dimmed());
        return;
    }

    match view.empty {
        Some(EmptyReason::NoFollowing) => {
            println!("  You are not following anyone yet.");
            return;
        }
        Some(EmptyReason::NoEvents) => {
            println!("  No activity to show.");
            return;
        }
        None => {}
    }

    println!();
    for event in &view.events {
        display_event(event);
    }

    let p = &view.pagination;
    println!(
        "\n  {} {}/{} ({} events){}{}",
        "Page".dimmed(),
        p.page(),
        p.total_pages(),
        p.total(),
        if p.has_previous() { "  <prev" } else { "" },
        if p.has_next() { "  next>" } else { "" },
    );
    if view.classification_gaps > 0 {
        println!(
            "  {} {} unrecognized events shown as Other",
            "~".yellow(),
            view.classification_gaps
        );
    }
}

fn display_event(event: &ActivityEvent) {
    let who = event.actor_username.as_deref().unwrap_or("You");
    let when = event
        .published_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "Unknown date".to_string());

    println!(
        "  {:<14} @{:<20} {}",
        colorize_category(event.category),
        who,
        when.dimmed(),
    );

    if let Some(summary) = &event.summary {
        println!("      {}", truncate_chars(summary, 100));
    }

    if let Some(r) = PostReactions::resolve(event) {
        println!(
            "      {} {}  {} {}",
            if r.is_liked_by_caller { "+".green().bold() } else { "+".normal() },
            r.like_count,
            if r.is_disliked_by_caller { "-".red().bold() } else { "-".normal() },
            r.dislike_count,
        );
    }
}

/// Display per-category counts for an offline classification run.
pub fn display_classification(batch: &NormalizedBatch) {
    println!(
        "\n{}",
        format!("=== Classified {} events ===", batch.events.len()).bold()
    );

    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    for event in &batch.events {
        *counts.entry(event.category).or_default() += 1;
    }

    for category in Category::ALL {
        let count = counts.get(&category).copied().unwrap_or(0);
        if count > 0 {
            println!("  {:<14} {:>6}", colorize_category(category), count);
        }
    }

    println!();
    if batch.classification_gaps > 0 {
        println!(
            "  {} {} events matched no rule",
            "~".yellow(),
            batch.classification_gaps
        );
    }
    if batch.duplicates > 0 {
        println!("  {} duplicate ids dropped", batch.duplicates);
    }
    if batch.rejected > 0 {
        println!("  {} {} records had no id", "!".bright_red(), batch.rejected);
    }
}

/// List the taxonomy and each surface's filter options.
pub fn display_categories(page_size: usize, bulk_page_size: usize) {
    println!("\n{}", "=== Categories ===".bold());
    for category in Category::ALL {
        println!("  {}", colorize_category(category));
    }

    for surface in Surface::ALL {
        let profile = surface.profile(page_size, bulk_page_size);
        let options: Vec<&str> = profile.category_options.iter().map(|c| c.label()).collect();
        println!(
            "\n  {} ({:?})\n    {}",
            surface.as_str().bold(),
            profile.strategy,
            options.join(", ")
        );
    }
}

fn colorize_category(category: Category) -> ColoredString {
    let name = category.as_str();
    match category {
        Category::CreateWaste => name.green(),
        Category::CreatePost | Category::UpdatePost => name.cyan(),
        Category::DeletePost => name.red(),
        Category::CreateComment | Category::UpdateComment => name.blue(),
        Category::LikePost => name.magenta(),
        Category::FollowUser | Category::UnfollowUser => name.yellow(),
        Category::Other => name.dimmed(),
    }
}
