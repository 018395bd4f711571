use camino::Utf8PathBuf;

use scry_dl::domain::{CardRecord, Quality};
use scry_dl::planner::plan;
use scry_dl::store::Store;

fn card(json: &str) -> CardRecord {
    serde_json::from_str(json).unwrap()
}

#[test]
fn double_faced_card_yields_one_task_per_face() {
    let card = card(
        r#"{
            "name": "Delver of Secrets // Insectile Aberration",
            "layout": "transform",
            "set": "isd",
            "card_faces": [
                {"name": "Delver of Secrets", "image_uris": {"large": "https://img/front-l.jpg", "normal": "https://img/front-n.jpg"}},
                {"name": "Insectile Aberration", "image_uris": {"large": "https://img/back-l.jpg"}}
            ]
        }"#,
    );

    let tasks = plan(&card, Quality::Large);
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].name, "Delver of Secrets");
    assert_eq!(tasks[0].url, "https://img/front-l.jpg");
    assert_eq!(tasks[1].name, "Insectile Aberration");
    assert_eq!(tasks[1].url, "https://img/back-l.jpg");
    assert!(tasks.iter().all(|task| task.set_code == "isd"));
}

#[test]
fn faces_without_images_are_skipped() {
    let card = card(
        r#"{
            "name": "Front // Back",
            "layout": "modal_dfc",
            "set": "znr",
            "card_faces": [
                {"name": "Front", "image_uris": {"normal": "https://img/front.jpg"}},
                {"name": "Back"}
            ]
        }"#,
    );

    let tasks = plan(&card, Quality::Normal);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Front");
}

#[test]
fn normal_card_falls_back_to_normal_quality() {
    let card = card(
        r#"{
            "name": "Llanowar Elves",
            "layout": "normal",
            "set": "dom",
            "image_uris": {"small": "https://img/s.jpg", "normal": "https://img/n.jpg"}
        }"#,
    );

    let tasks = plan(&card, Quality::Large);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Llanowar Elves");
    assert_eq!(tasks[0].url, "https://img/n.jpg");
}

#[test]
fn split_card_uses_only_available_quality() {
    let card = card(
        r#"{
            "name": "Fire // Ice",
            "layout": "split",
            "set": "mh2",
            "image_uris": {"large": "u1"}
        }"#,
    );

    let tasks = plan(&card, Quality::Small);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Fire // Ice");
    assert_eq!(tasks[0].url, "u1");
}

#[test]
fn card_without_any_images_yields_nothing() {
    let nameless = card(r#"{"name": "Nameless", "layout": "normal", "set": "dom"}"#);
    assert!(plan(&nameless, Quality::Large).is_empty());

    let oddity = card(
        r#"{"name": "Oddity", "layout": "normal", "set": "dom", "image_uris": {"png": "https://img/p.png"}}"#,
    );
    assert!(plan(&oddity, Quality::Large).is_empty());
}

#[test]
fn blank_url_for_first_present_quality_yields_nothing() {
    let card = card(
        r#"{
            "name": "Blank",
            "layout": "normal",
            "set": "dom",
            "image_uris": {"large": "  ", "normal": "https://img/n.jpg"}
        }"#,
    );
    assert!(plan(&card, Quality::Large).is_empty());
}

#[test]
fn adventure_card_is_named_after_front_face() {
    let card = card(
        r#"{
            "name": "Bonecrusher Giant // Stomp",
            "layout": "adventure",
            "set": "eld",
            "image_uris": {"large": "https://img/giant.jpg"}
        }"#,
    );

    let tasks = plan(&card, Quality::Large);
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name, "Bonecrusher Giant");
}

#[test]
fn unknown_layout_with_faces_plans_each_face() {
    let card = card(
        r#"{
            "name": "Invasion of Zendikar // Awakened Skyclave",
            "layout": "battle",
            "set": "mom",
            "card_faces": [
                {"name": "Invasion of Zendikar", "image_uris": {"large": "https://img/a.jpg"}},
                {"name": "Awakened Skyclave", "image_uris": {"large": "https://img/b.jpg"}}
            ]
        }"#,
    );

    let names = plan(&card, Quality::Large)
        .into_iter()
        .map(|task| task.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Invasion of Zendikar", "Awakened Skyclave"]);
}

#[test]
fn flip_card_without_own_images_uses_faces() {
    let card = card(
        r#"{
            "name": "Erayo, Soratami Ascendant // Erayo's Essence",
            "layout": "flip",
            "set": "sok",
            "card_faces": [
                {"name": "Erayo, Soratami Ascendant", "image_uris": {"normal": "https://img/up.jpg"}},
                {"name": "Erayo's Essence", "image_uris": {"normal": "https://img/down.jpg"}}
            ]
        }"#,
    );

    let tasks = plan(&card, Quality::Normal);
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].name, "Erayo's Essence");
}

#[test]
fn planned_names_map_to_safe_paths() {
    let card = card(
        r#"{
            "name": "Who/What/When/Where/Why",
            "layout": "normal",
            "set": "unh",
            "image_uris": {"large": "https://img/who.jpg"}
        }"#,
    );
    let store = Store::new(Utf8PathBuf::from("downloads"));

    let tasks = plan(&card, Quality::Large);
    let path = store.image_path(&tasks[0]).unwrap();
    let file_name = path.file_name().unwrap();
    assert_eq!(file_name, "WhoWhatWhenWhereWhy.full.jpg");
    assert!(path.starts_with("downloads/UNH"));
}
