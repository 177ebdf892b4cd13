//! RSS feed generation.
//!
//! Only articles with a date take part. They are ordered newest first, with
//! the source path as tie-break so equal dates always come out the same
//! way, then cut to `max_items`. The channel carries no build timestamp:
//! an unchanged source tree produces a byte-identical feed.

use chrono::NaiveDateTime;
use rss::{ChannelBuilder, GuidBuilder, Item, ItemBuilder};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::articles::ArticleEntry;
use crate::config::FeedConfig;
use crate::naming;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("feed is enabled but `feed.{field}` is empty")]
    Config { field: &'static str },
}

/// The part of an article the feed needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub title: String,
    pub route: String,
    pub date: NaiveDateTime,
    pub summary: String,
    pub source: PathBuf,
}

impl FeedItem {
    /// `None` for undated articles.
    pub fn from_article(article: &ArticleEntry) -> Option<Self> {
        Some(Self {
            title: article
                .title()
                .map(str::to_string)
                .unwrap_or_else(|| article.name.clone()),
            route: article.route.clone(),
            date: article.date?,
            summary: article.summary(),
            source: article.source.clone(),
        })
    }
}

/// Dated articles, newest first, truncated to `max_items`.
pub fn select(articles: &[ArticleEntry], max_items: Option<usize>) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = articles.iter().filter_map(FeedItem::from_article).collect();
    items.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.source.cmp(&b.source)));
    if let Some(max) = max_items {
        items.truncate(max);
    }
    items
}

/// Absolute link of a route below the channel link.
pub fn item_link(channel_link: &str, route: &str) -> String {
    format!("{}{}", channel_link.trim_end_matches('/'), naming::url_path(route))
}

/// Render the RSS 2.0 document for `articles`.
pub fn generate(articles: &[ArticleEntry], config: &FeedConfig) -> Result<String, FeedError> {
    if config.title.trim().is_empty() {
        return Err(FeedError::Config { field: "title" });
    }
    if config.link.trim().is_empty() {
        return Err(FeedError::Config { field: "link" });
    }

    let selected = select(articles, config.max_items);
    debug!(count = selected.len(), "generating RSS feed");

    let items: Vec<Item> = selected.iter().map(|i| to_item(i, &config.link)).collect();
    let description = if config.description.is_empty() {
        &config.title
    } else {
        &config.description
    };

    let channel = ChannelBuilder::default()
        .title(config.title.clone())
        .link(config.link.clone())
        .description(description.clone())
        .language(Some(config.language.clone()))
        .items(items)
        .build();

    Ok(channel.to_string())
}

fn to_item(item: &FeedItem, channel_link: &str) -> Item {
    let link = item_link(channel_link, &item.route);
    let guid = GuidBuilder::default().value(link.clone()).permalink(true).build();

    let mut builder = ItemBuilder::default();
    builder.title(Some(item.title.clone()));
    builder.link(Some(link));
    builder.guid(Some(guid));
    builder.pub_date(Some(
        item.date.format("%a, %d %b %Y %H:%M:%S +0000").to_string(),
    ));
    if !item.summary.is_empty() {
        builder.description(Some(item.summary.clone()));
    }
    builder.build()
}
