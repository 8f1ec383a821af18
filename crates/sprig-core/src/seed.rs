use chrono::{DateTime, Duration, Utc};

use crate::plant::{CareLogEntry, CareTask, Plant};

pub const PLACEHOLDER_IMAGE: &str = "https://placehold.co/600x600.png";

pub fn seed_catalog(now: DateTime<Utc>) -> Vec<Plant> {
    vec![
        plant(
            "1",
            "Monstera Deliciosa",
            "Tropical",
            "A large, popular houseplant with iconic split leaves. Likes bright, indirect \
             light and well-draining soil.",
            vec![
                task("s1-1", "Water", 7, now - Duration::days(5)),
                task("s1-2", "Fertilize", 30, now - Duration::days(20)),
            ],
            vec![note(
                "l1-1",
                "Water",
                now - Duration::days(5),
                Some("Soil was dry to the touch."),
            )],
        ),
        plant(
            "2",
            "Snake Plant",
            "Succulent",
            "Extremely hardy and low-maintenance. Tolerates low light and infrequent watering.",
            vec![task("s2-1", "Water", 21, now - Duration::days(10))],
            vec![],
        ),
        plant(
            "3",
            "Fiddle Leaf Fig",
            "Ficus",
            "A stylish plant with large, violin-shaped leaves. Can be finicky and requires \
             consistent care.",
            vec![
                task("s3-1", "Water", 10, now - Duration::days(2)),
                task("s3-2", "Prune", 90, now - Duration::days(80)),
            ],
            vec![note("l3-1", "Water", now - Duration::days(2), None)],
        ),
        plant(
            "4",
            "Pothos",
            "Vine",
            "A forgiving and fast-growing vine, perfect for beginners. Trails beautifully \
             from hanging baskets.",
            vec![task("s4-1", "Water", 10, now - Duration::days(11))],
            vec![],
        ),
        plant(
            "5",
            "Spider Plant",
            "Air-purifying",
            "Known for its arching leaves and ability to produce \"pups\". Very easy to care \
             for and propagate.",
            vec![task("s5-1", "Water", 7, now - Duration::days(3))],
            vec![note(
                "l5-1",
                "Water",
                now - Duration::days(3),
                Some("Watered thoroughly."),
            )],
        ),
        plant(
            "6",
            "ZZ Plant",
            "Low-light",
            "Zamioculcas zamiifolia is drought-tolerant and accepts low-light conditions \
             without fuss.",
            vec![task("s6-1", "Water", 25, now - Duration::days(15))],
            vec![],
        ),
        plant(
            "7",
            "Rubber Plant",
            "Ficus",
            "A popular houseplant with dark, glossy leaves. Prefers bright, indirect light \
             and can grow quite tall.",
            vec![
                task("s7-1", "Water", 14, now - Duration::days(7)),
                task("s7-2", "Fertilize", 60, now - Duration::days(30)),
            ],
            vec![note("l7-1", "Water", now - Duration::days(7), None)],
        ),
        plant(
            "8",
            "Calathea Orbifolia",
            "Prayer Plant",
            "Beautiful round leaves with silver stripes. Requires high humidity and \
             consistently moist soil.",
            vec![task("s8-1", "Water", 5, now - Duration::days(1))],
            vec![],
        ),
        plant(
            "9",
            "Boston Fern",
            "Fern",
            "Loves high humidity and indirect light, making it a great bathroom plant. \
             Features feathery, green fronds.",
            vec![task("s9-1", "Water", 4, now - Duration::days(2))],
            vec![note(
                "l9-1",
                "Water",
                now - Duration::days(2),
                Some("Misted leaves as well."),
            )],
        ),
        plant(
            "10",
            "Peace Lily",
            "Flowering",
            "Known for its beautiful white spathes and air-purifying qualities. It will \
             droop dramatically when it needs water.",
            vec![task("s10-1", "Water", 6, now - Duration::days(6))],
            vec![],
        ),
        plant(
            "11",
            "Succulent Mix",
            "Succulent",
            "A small collection of various succulents in a single pot. Great for sunny \
             windowsills.",
            vec![task("s11-1", "Water", 20, now - Duration::days(8))],
            vec![],
        ),
        plant(
            "12",
            "Orchid",
            "Flowering",
            "Elegant flowering plant that can be tricky to care for but rewards with \
             beautiful blooms. Likes specific orchid potting mix.",
            vec![task("s12-1", "Water", 9, now - Duration::days(4))],
            vec![],
        ),
        plant(
            "13",
            "Air Plant",
            "Tillandsia",
            "A unique plant that doesn't require soil to grow. It absorbs nutrients and \
             water through its leaves.",
            vec![task("s13-1", "Water", 10, now - Duration::days(3))],
            vec![],
        ),
        plant(
            "14",
            "Jade Plant",
            "Succulent",
            "A popular good-luck plant with fleshy, oval-shaped leaves. It is relatively \
             easy to care for and can live for a long time.",
            vec![task("s14-1", "Water", 20, now - Duration::days(10))],
            vec![],
        ),
        plant(
            "15",
            "Areca Palm",
            "Palm",
            "A popular and elegant palm with arching fronds. It helps in purifying the air \
             and is relatively easy to grow indoors.",
            vec![task("s15-1", "Water", 7, now - Duration::days(2))],
            vec![],
        ),
    ]
}

fn plant(
    id: &str,
    name: &str,
    kind: &str,
    description: &str,
    schedule: Vec<CareTask>,
    log: Vec<CareLogEntry>,
) -> Plant {
    Plant {
        id: id.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        image_url: PLACEHOLDER_IMAGE.to_string(),
        description: description.to_string(),
        schedule,
        log,
    }
}

fn task(id: &str, kind: &str, frequency_days: u32, last_completed: DateTime<Utc>) -> CareTask {
    CareTask {
        id: id.to_string(),
        kind: kind.to_string(),
        frequency_days,
        last_completed,
    }
}

fn note(id: &str, task_type: &str, date: DateTime<Utc>, notes: Option<&str>) -> CareLogEntry {
    CareLogEntry {
        id: id.to_string(),
        task_type: task_type.to_string(),
        date,
        notes: notes.map(str::to_string),
        photo_url: None,
    }
}
