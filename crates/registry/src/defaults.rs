//! Built-in registry used when no registry file is configured.

use crate::registry::{TaskRegistry, TaskTemplate};
use dayflow_core::{Pillar, Priority, TaskAction};

fn navigate(target: &str) -> TaskAction {
    TaskAction::Navigate { target: target.to_string() }
}

fn invoke(handler_id: &str) -> TaskAction {
    TaskAction::Invoke { handler_id: handler_id.to_string() }
}

/// The six-pillar content workflow: Plan → Generate → Publish → Analyze →
/// Engage → Remarket.
pub fn default_registry() -> TaskRegistry {
    let pillars = vec![
        Pillar::new("plan", "Plan", 1),
        Pillar::new("generate", "Generate", 2),
        Pillar::new("publish", "Publish", 3),
        Pillar::new("analyze", "Analyze", 4),
        Pillar::new("engage", "Engage", 5),
        Pillar::new("remarket", "Remarket", 6),
    ];

    let tasks = vec![
        TaskTemplate::new("plan.review-calendar", "plan", "Review content calendar", 10)
            .with_description("Check what is scheduled for today and this week.")
            .with_priority(Priority::High)
            .with_action(navigate("/calendar")),
        TaskTemplate::new("plan.keyword-research", "plan", "Keyword research", 20)
            .with_description("Find keywords worth targeting today.")
            .with_priority(Priority::High)
            .with_action(navigate("/research/keywords")),
        TaskTemplate::new("plan.pick-topic", "plan", "Pick today's topic", 10)
            .depends_on("plan.keyword-research")
            .with_action(invoke("pick-topic")),
        TaskTemplate::new("generate.draft-article", "generate", "Draft article", 45)
            .with_description("Write the first draft for today's topic.")
            .depends_on("plan.pick-topic")
            .with_priority(Priority::High)
            .with_action(invoke("draft-article")),
        TaskTemplate::new("generate.create-visuals", "generate", "Create visuals", 20)
            .with_action(invoke("create-visuals")),
        TaskTemplate::new("generate.seo-review", "generate", "SEO review", 15)
            .depends_on("generate.draft-article")
            .with_action(navigate("/seo/review")),
        TaskTemplate::new("publish.schedule-post", "publish", "Schedule post", 10)
            .depends_on("generate.seo-review")
            .with_priority(Priority::High)
            .with_action(navigate("/publish")),
        TaskTemplate::new("publish.share-social", "publish", "Share on social channels", 10)
            .depends_on("publish.schedule-post")
            .with_action(invoke("share-social")),
        TaskTemplate::new("analyze.review-metrics", "analyze", "Review yesterday's metrics", 15)
            .with_action(navigate("/analytics")),
        TaskTemplate::new("analyze.check-rankings", "analyze", "Check search rankings", 10)
            .with_priority(Priority::Low)
            .with_action(navigate("/analytics/rankings")),
        TaskTemplate::new("engage.reply-comments", "engage", "Reply to comments", 20)
            .with_action(navigate("/inbox")),
        TaskTemplate::new("engage.community", "engage", "Join a community thread", 15)
            .with_priority(Priority::Low),
        TaskTemplate::new("remarket.newsletter", "remarket", "Add post to newsletter", 20)
            .depends_on("publish.schedule-post")
            .with_action(invoke("newsletter")),
        TaskTemplate::new("remarket.retarget-audience", "remarket", "Refresh retargeting audience", 15)
            .with_priority(Priority::Low),
    ];

    // Checked by test_default_registry_is_valid.
    match TaskRegistry::new(pillars, tasks) {
        Ok(registry) => registry,
        Err(e) => unreachable!("built-in registry is invalid: {e}"),
    }
}
