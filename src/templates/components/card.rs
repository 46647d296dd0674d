use maud::{html, Markup};

/// A titled dashboard panel.
pub fn card(title: &str, body: Markup) -> Markup {
    html! {
        section class="card" {
            h3 { (title) }
            (body)
        }
    }
}
