// templates/pages/home.rs

use crate::db::scrapes::ScrapeRun;
use crate::db::stats::PropertyStats;
use crate::domain::Source;
use crate::ingest::IngestProgress;
use crate::sources::regions::STATES;
use crate::templates::{card, desktop_layout};
use crate::verify::VerificationProgress;
use chrono::DateTime;
use maud::{html, Markup};
use std::collections::BTreeMap;

pub struct HomeVm {
    pub stats: PropertyStats,
    pub recent_scrapes: Vec<ScrapeRun>,
    pub ingest: BTreeMap<&'static str, IngestProgress>,
    pub verification: VerificationProgress,
}

fn timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn count_table(title: &str, rows: &[(String, i64)]) -> Markup {
    card(
        title,
        html! {
            @if rows.is_empty() {
                p class="muted" { "Nothing yet." }
            } @else {
                table {
                    tbody {
                        @for (key, n) in rows {
                            tr { td { (key) } td class="num" { (n) } }
                        }
                    }
                }
            }
        },
    )
}

fn scraper_card(vm: &HomeVm) -> Markup {
    card(
        "Scraper",
        html! {
            form action="/scraper/start" method="post" {
                label for="scrape-source" { "Source" }
                select id="scrape-source" name="source" {
                    @for s in Source::ALL {
                        option value=(s.as_str()) { (s.as_str()) }
                    }
                }
                label for="scrape-states" { "States (none selected = all)" }
                select id="scrape-states" name="states" multiple size="6" {
                    @for st in STATES {
                        option value=(st.name) { (st.name) }
                    }
                }
                button class="btn" type="submit" { "Start scrape" }
            }

            @for (source, p) in &vm.ingest {
                div class="run-status" {
                    strong { (source) }
                    @if p.running { " running" } @else { " idle" }
                    " · partitions " (p.partitions_done) "/" (p.partitions_total)
                    " · inserted " (p.inserted) " · skipped " (p.skipped)
                    @if let Some(partition) = &p.current_partition {
                        " · " (partition)
                    }
                    @if p.running {
                        form action="/scraper/stop" method="post" class="inline" {
                            input type="hidden" name="source" value=(source);
                            button class="btn btn-secondary" type="submit" { "Stop" }
                        }
                    }
                }
            }
        },
    )
}

fn checker_card(vm: &HomeVm) -> Markup {
    let v = &vm.verification;
    card(
        "Address checker",
        html! {
            form action="/checker/start" method="post" {
                label for="check-source" { "Source" }
                select id="check-source" name="source" {
                    option value="" { "all" }
                    @for s in Source::ALL {
                        option value=(s.as_str()) { (s.as_str()) }
                    }
                }
                label { input type="checkbox" name="include_failed" value="true" checked; " Retry soft failures" }
                // First value wins, so this only applies when the box is unchecked.
                input type="hidden" name="include_failed" value="false";
                label { input type="checkbox" name="retry_api_only" value="true"; " Only API errors" }
                label for="check-limit" { "Limit" }
                input id="check-limit" type="number" name="limit" min="1";
                button class="btn" type="submit" { "Start checker" }
            }

            div class="run-status" {
                @if v.running { "running" } @else { "idle" }
                " · processed " (v.counts.processed)
                " · verified " (v.counts.verified)
                " · failed " (v.counts.failed)
                @if v.halted {
                    p class="error" { "Halted: " (v.message.as_deref().unwrap_or("")) }
                }
                @if v.running {
                    form action="/checker/stop" method="post" class="inline" {
                        button class="btn btn-secondary" type="submit" { "Stop" }
                    }
                }
            }

            p { a href="/checker/download" { "Download verified properties (.xlsx)" } }
        },
    )
}

fn scrape_history(runs: &[ScrapeRun]) -> Markup {
    card(
        "Recent scrapes",
        html! {
            table {
                thead {
                    tr {
                        th { "Started" } th { "Source" } th { "States" }
                        th { "Pages" } th { "Inserted" } th { "Skipped" } th { "Result" }
                    }
                }
                tbody {
                    @for run in runs {
                        tr {
                            td { (timestamp(run.started_at)) }
                            td { (run.source) }
                            td { (run.states) }
                            td class="num" { (run.pages_fetched.unwrap_or(0)) }
                            td class="num" { (run.inserted.unwrap_or(0)) }
                            td class="num" { (run.skipped.unwrap_or(0)) }
                            td {
                                @match (run.finished_at, run.success) {
                                    (None, _) => "in progress",
                                    (Some(_), true) => "ok",
                                    (Some(_), false) => (run.error_message.as_deref().unwrap_or("failed")),
                                }
                            }
                        }
                    }
                }
            }
        },
    )
}

pub fn home_page(vm: &HomeVm) -> Markup {
    desktop_layout(
        "Dashboard",
        html! {
            main class="container" {
                h1 { "Dashboard" }
                p {
                    strong { (vm.stats.total) } " properties, "
                    strong { (vm.stats.verified) } " verified"
                }

                div class="grid" {
                    (scraper_card(vm))
                    (checker_card(vm))
                }

                div class="grid" {
                    (count_table("By source", &vm.stats.by_source))
                    (count_table("By state", &vm.stats.by_state))
                    (count_table("By failure reason", &vm.stats.by_failure_reason))
                }

                (scrape_history(&vm.recent_scrapes))
            }
        },
    )
}
