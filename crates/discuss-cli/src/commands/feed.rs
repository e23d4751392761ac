use super::AppContext;
use anyhow::Result;
use colored::Colorize;
use discuss_application::{FeedEngine, FeedOptions, ScrollLoader, ViewportMetrics};
use discuss_core::feed::{FeedFilters, FeedState, ResourceSelector, SortBy, TimeWindow};
use discuss_core::post::Post;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Height of the synthetic terminal viewport, in pixels.
const VIEWPORT_HEIGHT: f64 = 800.0;

pub async fn run(
    context: &AppContext,
    selector: &str,
    sort: SortBy,
    window: TimeWindow,
    pages: usize,
) -> Result<()> {
    context.session.bootstrap().await;
    let listener = context.session.spawn_unauthorized_listener();

    let engine = Arc::new(
        FeedEngine::open(
            context.api.clone(),
            context.cache.clone(),
            ResourceSelector::parse(selector),
            FeedFilters::new(sort, window),
            FeedOptions::from_config(&context.config),
        )
        .await?,
    );
    engine.sync_with_session(&context.session.snapshot()).await?;
    let follower = engine.follow_session(context.session.subscribe());
    let loader = ScrollLoader::new(engine.clone());

    // Every synthetic event parks the viewport at the bottom of the content,
    // so each one asks for the next page.
    let (tx, rx) = mpsc::channel(pages.max(1));
    for _ in 0..pages {
        tx.send(ViewportMetrics::new(0.0, 0.0, VIEWPORT_HEIGHT)).await?;
    }
    drop(tx);
    loader.run(rx).await;

    print_feed(&engine.state());
    follower.abort();
    listener.abort();
    Ok(())
}

fn print_feed(state: &FeedState) {
    println!("{}", state.key.to_string().bold());

    if state.auth_required {
        println!(
            "{}",
            "Please log in to view this feed (discuss login --payload ...).".yellow()
        );
        return;
    }
    if state.is_empty_result() {
        println!("No posts with this filter were found. Be the first to add one!");
        return;
    }

    for post in state.posts() {
        print_post(post);
    }

    if let Some(error) = &state.error {
        println!("{} {}", "Error:".red().bold(), error);
    } else if state.has_next_page {
        println!("{}", "... more posts available (--pages)".dimmed());
    }
}

fn print_post(post: &Post) {
    let info = &post.post_info;
    let thread = post
        .thread_info
        .as_ref()
        .and_then(|t| t.thread_name.as_deref())
        .map(|name| format!("t/{name}"))
        .unwrap_or_default();
    let author = post
        .user_info
        .as_ref()
        .and_then(|u| u.user_name.as_deref())
        .map(|name| format!("u/{name}"))
        .unwrap_or_default();

    println!(
        "{:>7}  {}  {} {}",
        info.id.to_string().dimmed(),
        info.title,
        thread.cyan(),
        author.dimmed()
    );
    println!(
        "         {} karma, {} comments",
        info.post_karma, info.comments_count
    );
}
