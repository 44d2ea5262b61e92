use rand::Rng;

const ADJECTIVES: [&str; 15] = [
    "Wandering",
    "Curious",
    "Adventurous",
    "Jolly",
    "Mysterious",
    "Cheerful",
    "Daring",
    "Energetic",
    "Friendly",
    "Graceful",
    "Happy",
    "Intrepid",
    "Joyful",
    "Kind",
    "Lucky",
];

const TRAVELERS: [&str; 15] = [
    "Explorer",
    "Voyager",
    "Wanderer",
    "Nomad",
    "Adventurer",
    "Globetrotter",
    "Traveler",
    "Backpacker",
    "Pioneer",
    "Discoverer",
    "Pathfinder",
    "Wayfarer",
    "Journeyer",
    "Rover",
    "Trekker",
];

/// Generate a random username for a player who never picked one,
/// e.g. "CuriousNomad42".
pub fn generate_guest_name() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES[rng.gen_range(0..ADJECTIVES.len())];
    let traveler = TRAVELERS[rng.gen_range(0..TRAVELERS.len())];

    format!("{}{}{}", adjective, traveler, rng.gen_range(0..1000))
}
