//! Turns card metadata into image download tasks.
//!
//! Planning is pure: no I/O, and the card is only borrowed. Each task
//! stands for exactly one image file.

use serde::Serialize;

use crate::domain::{CardRecord, Face, ImageVariants, Layout, Quality};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadTask {
    /// Logical file name before sanitisation (card or face name).
    pub name: String,
    pub url: String,
    pub set_code: String,
}

/// Picks the first quality of the fallback chain present in `variants`.
/// A present but blank URL ends the search without a result.
pub fn select_image(variants: &ImageVariants, preferred: Quality) -> Option<&str> {
    preferred
        .fallback_chain()
        .into_iter()
        .find_map(|quality| variants.get(quality.as_str()))
        .map(String::as_str)
        .filter(|url| !url.trim().is_empty())
}

pub fn plan(card: &CardRecord, preferred: Quality) -> Vec<DownloadTask> {
    let mut tasks = Vec::new();
    match &card.layout {
        Layout::Adventure => {
            push_single(&mut tasks, card, card.front_name(), preferred);
        }
        Layout::Transform
        | Layout::ModalDoubleFaced
        | Layout::Reversible
        | Layout::DoubleFacedToken => {
            push_faces(&mut tasks, card, preferred);
        }
        Layout::Split | Layout::Flip => {
            if card.has_images() {
                push_single(&mut tasks, card, &card.name, preferred);
            } else {
                push_faces(&mut tasks, card, preferred);
            }
        }
        Layout::Normal | Layout::Other(_) => {
            if card.is_multi_face_name() && !card.card_faces.is_empty() {
                push_faces(&mut tasks, card, preferred);
            } else {
                push_single(&mut tasks, card, &card.name, preferred);
            }
        }
    }
    tasks
}

pub fn plan_all<'a, I>(cards: I, preferred: Quality) -> Vec<DownloadTask>
where
    I: IntoIterator<Item = &'a CardRecord>,
{
    cards
        .into_iter()
        .flat_map(|card| plan(card, preferred))
        .collect()
}

fn push_single(tasks: &mut Vec<DownloadTask>, card: &CardRecord, name: &str, preferred: Quality) {
    let Some(variants) = card.image_uris.as_ref() else {
        return;
    };
    if let Some(url) = select_image(variants, preferred) {
        tasks.push(DownloadTask {
            name: name.to_string(),
            url: url.to_string(),
            set_code: card.set.clone(),
        });
    }
}

fn push_faces(tasks: &mut Vec<DownloadTask>, card: &CardRecord, preferred: Quality) {
    for face in card.card_faces.iter().filter(|face| face.has_images()) {
        push_face(tasks, card, face, preferred);
    }
}

fn push_face(tasks: &mut Vec<DownloadTask>, card: &CardRecord, face: &Face, preferred: Quality) {
    let Some(variants) = face.image_uris.as_ref() else {
        return;
    };
    if let Some(url) = select_image(variants, preferred) {
        tasks.push(DownloadTask {
            name: face.name.clone(),
            url: url.to_string(),
            set_code: card.set.clone(),
        });
    }
}
