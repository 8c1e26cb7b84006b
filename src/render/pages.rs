use maud::{html, Markup};

use crate::leads::MIN_MESSAGE_LEN;
use crate::models::ContactSubmission;
use crate::render::{base_document, notice, PageContext};

pub fn about_page(ctx: &PageContext) -> Markup {
    let content = html! {
        section.about {
            h1 { "About us" }
            p.lead { "Premium real estate, photographed honestly and priced transparently." }
            div.about-grid {
                div {
                    h2 { "What we do" }
                    p {
                        "We list apartments, villas, studios and office space that we have visited "
                        "ourselves. Every listing carries real photographs and a map so you can judge "
                        "the neighbourhood before you travel."
                    }
                    p {
                        "Ask about any property on WhatsApp, send us a message or book a callback and "
                        "an advisor will get in touch the same day."
                    }
                }
                address {
                    strong { "Head office" } br;
                    "No. 12, Prestige Chambers" br;
                    "MG Road, Bengaluru, Karnataka" br;
                    "PIN 560001"
                }
            }
            div.actions {
                a.button href="/listings" { "Browse listings" }
                a.button.whatsapp href=(ctx.whatsapp_link) target="_blank" rel="noopener noreferrer" {
                    "Chat on WhatsApp"
                }
            }
        }
    };
    base_document("About", ctx, content)
}

/// What the contact page shows above the form
#[derive(Debug, Clone, PartialEq)]
pub enum ContactStatus {
    Blank,
    Sent,
    Failed(String),
}

pub fn contact_page(ctx: &PageContext, form: &ContactSubmission, status: &ContactStatus) -> Markup {
    let content = html! {
        section.contact {
            h1 { "Contact us" }
            p { "Questions about a listing or want to schedule a visit? Write to us." }
            @match status {
                ContactStatus::Sent => { (notice("success", "Thanks! Your message has been sent.")) }
                ContactStatus::Failed(message) => { (notice("error", message)) }
                ContactStatus::Blank => {}
            }
            form.contact-form method="post" action="/contact" {
                label {
                    "Name"
                    input type="text" name="name" required value=(form.name);
                }
                label {
                    "Email"
                    input type="email" name="email" required value=(form.email);
                }
                label {
                    "Subject"
                    input type="text" name="subject" required value=(form.subject);
                }
                label {
                    "Message"
                    textarea name="message" rows="6" required minlength=(MIN_MESSAGE_LEN) { (form.message) }
                }
                button type="submit" { "Send message" }
            }
        }
    };
    base_document("Contact", ctx, content)
}
