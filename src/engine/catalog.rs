//! Fixed reference data used by the simulated classifier.

pub(crate) struct WildlifeEntry {
    pub name: &'static str,
    /// Lowercase filename fragments that select this entry.
    pub keywords: &'static [&'static str],
    pub description: &'static str,
    pub habitat: &'static str,
    pub safety_tips: &'static [&'static str],
    pub fun_fact: &'static str,
}

pub(crate) const WILDLIFE: &[WildlifeEntry] = &[
    WildlifeEntry {
        name: "Bengal Tiger",
        keywords: &["tiger"],
        description: "The largest living cat, a solitary ambush hunter recognizable by its dark vertical stripes on an orange coat.",
        habitat: "Tropical and subtropical forests, mangrove swamps and grasslands of South Asia.",
        safety_tips: &[
            "Never approach; keep at least 100 meters of distance.",
            "Do not run. Back away slowly while facing the animal.",
            "Travel in groups and make noise in tiger country.",
        ],
        fun_fact: "No two tigers share the same stripe pattern, and the stripes continue on their skin.",
    },
    WildlifeEntry {
        name: "African Lion",
        keywords: &["lion"],
        description: "A social big cat living in prides, with males carrying the distinctive mane.",
        habitat: "Savannas, open woodlands and scrub of sub-Saharan Africa.",
        safety_tips: &[
            "Stay inside the vehicle on safari drives.",
            "Never get between a lioness and her cubs.",
            "If confronted, stand tall and do not turn your back.",
        ],
        fun_fact: "A lion's roar can be heard up to 8 kilometers away.",
    },
    WildlifeEntry {
        name: "African Elephant",
        keywords: &["elephant"],
        description: "The largest land animal, a highly intelligent herbivore living in matriarchal herds.",
        habitat: "Savannas, forests and deserts across sub-Saharan Africa.",
        safety_tips: &[
            "Watch for flared ears and a raised trunk as warning signs.",
            "Give herds with calves a very wide berth.",
            "Never block an elephant's path.",
        ],
        fun_fact: "Elephants can recognize themselves in a mirror.",
    },
    WildlifeEntry {
        name: "Brown Bear",
        keywords: &["bear", "grizzly"],
        description: "A large omnivore with a prominent shoulder hump, capable of sprinting over 50 km/h.",
        habitat: "Forests, mountains and tundra across North America, Europe and Asia.",
        safety_tips: &[
            "Carry bear spray and know how to use it.",
            "Store food in bear-proof containers.",
            "Speak calmly and back away if you encounter one.",
        ],
        fun_fact: "Brown bears can smell food from more than 30 kilometers away.",
    },
    WildlifeEntry {
        name: "Gray Wolf",
        keywords: &["wolf", "wolves"],
        description: "A pack-living canid that hunts cooperatively and communicates through howls.",
        habitat: "Forests, tundra, grasslands and mountains of the Northern Hemisphere.",
        safety_tips: &[
            "Keep dogs leashed in wolf territory.",
            "Make yourself look large and shout if a wolf approaches.",
            "Never feed wild wolves.",
        ],
        fun_fact: "A wolf pack's territory can span more than 1,000 square kilometers.",
    },
    WildlifeEntry {
        name: "Red Fox",
        keywords: &["fox"],
        description: "A small, adaptable canid with a bushy white-tipped tail, active mostly at dusk and night.",
        habitat: "Woodlands, farmland and cities across the Northern Hemisphere and Australia.",
        safety_tips: &[
            "Do not hand-feed foxes.",
            "Secure garbage and pet food outdoors.",
            "Avoid contact with foxes behaving unusually tame.",
        ],
        fun_fact: "Red foxes use the Earth's magnetic field to aim their pounces.",
    },
    WildlifeEntry {
        name: "White-tailed Deer",
        keywords: &["deer", "fawn"],
        description: "A graceful herbivore that flashes the white underside of its tail when alarmed.",
        habitat: "Forests, fields and suburbs from Canada to South America.",
        safety_tips: &[
            "Slow down when driving at dawn and dusk.",
            "Keep away from bucks during the autumn rut.",
            "Leave fawns alone; the mother is usually nearby.",
        ],
        fun_fact: "A deer's antlers are among the fastest-growing tissues of any mammal.",
    },
    WildlifeEntry {
        name: "Great Horned Owl",
        keywords: &["owl"],
        description: "A powerful nocturnal raptor with feathered ear tufts and piercing yellow eyes.",
        habitat: "Forests, deserts, wetlands and cities throughout the Americas.",
        safety_tips: &[
            "Keep away from nests during breeding season.",
            "Wear a hat when walking near defended nests.",
            "Observe from a distance with binoculars.",
        ],
        fun_fact: "Owls can rotate their heads up to 270 degrees.",
    },
];

/// Select a wildlife entry whose keyword appears in `file_name`.
pub(crate) fn match_wildlife(file_name: &str) -> Option<&'static WildlifeEntry> {
    let lower = file_name.to_lowercase();
    WILDLIFE
        .iter()
        .find(|e| e.keywords.iter().any(|k| lower.contains(k)))
}

pub(crate) struct LivestockEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub fun_fact: &'static str,
}

pub(crate) const CATTLE: LivestockEntry = LivestockEntry {
    name: "Cattle",
    description: "Domestic bovine raised for milk, meat and draught power.",
    fun_fact: "Cattle have nearly 360-degree panoramic vision.",
};

pub(crate) const BUFFALO: LivestockEntry = LivestockEntry {
    name: "Buffalo",
    description: "Water buffalo, a heavy-set bovine valued for rich milk and work in wet fields.",
    fun_fact: "Buffalo milk carries roughly twice the fat of cow milk.",
};

pub(crate) const LIVESTOCK_CONTEXT: &str = "Body structure assessment";

pub(crate) const LIVESTOCK_RECOMMENDATIONS: &[&str] = &[
    "Excellent body structure indicates good breeding potential",
    "Consider nutrition optimization for enhanced muscle development",
    "Regular health monitoring recommended for optimal productivity",
    "Genetic traits suggest strong reproductive capabilities",
];
