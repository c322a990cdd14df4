//! Application constants for shmupfetch
//!
//! This module centralizes the constants used throughout the application,
//! organized by functional domain. The `defaults` tables seed the generated
//! configuration file; at runtime every component reads its policy from
//! configuration instead.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 4;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for catalog requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 3;

    /// Maximum attempts for a single request or part
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// Maximum backoff delay (seconds)
    pub const MAX_BACKOFF_SECS: u64 = 30;

    /// Backoff multiplier between attempts
    pub const BACKOFF_MULTIPLIER: f64 = 2.0;

    /// Upper bound on listing pages followed per manufacturer
    pub const MAX_LISTING_PAGES: usize = 50;
}

/// Remote catalog endpoints
pub mod mdk {
    /// Catalog base URL
    pub const BASE_URL: &str = "https://mdk.cab";

    /// Path prefix of manufacturer listing pages
    pub const MANUFACTURER_PATH: &str = "manufacturer";

    /// Path prefix of game detail pages
    pub const GAME_PATH: &str = "game";

    /// Path segment marking CHD downloads
    pub const CHD_SEGMENT: &str = "/download/chd/";
}

/// Web scraping CSS selectors
pub mod selectors {
    /// Game links on listing pages
    pub const GAME_LINK: &str = "a[href^='/game/']";

    /// Pagination link to the next listing page
    pub const NEXT_PAGE: &str = "a[rel='next']";

    /// Title heading on a detail page
    pub const DETAIL_TITLE: &str = "h1";

    /// Genre/category token on a detail page
    pub const DETAIL_GENRE: &str = ".genre";

    /// Parent set link on a detail page
    pub const DETAIL_PARENT: &str = ".parent a[href^='/game/']";

    /// Download links on a detail page
    pub const DOWNLOAD_LINK: &str = "a[href*='/download/']";

    /// Attribute carrying a part's byte size
    pub const SIZE_ATTR: &str = "data-size";

    /// Attribute carrying a part's role
    pub const ROLE_ATTR: &str = "data-role";
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Name prefix of the hidden per-entry staging directories
    pub const STAGING_PREFIX: &str = ".shmupfetch-staging-";

    /// Default archive extension for ROM sets
    pub const ARCHIVE_EXTENSION: &str = "zip";

    /// Catalog store file name
    pub const CATALOG_FILE: &str = "catalog.json";

    /// Application directory name under the OS config/cache roots
    pub const APP_DIR: &str = "shmupfetch";

    /// Project-local configuration file name
    pub const LOCAL_CONFIG_FILE: &str = "shmupfetch.toml";
}

/// Worker and concurrency configuration
pub mod workers {
    /// Default number of concurrent entry downloads
    pub const DEFAULT_WORKER_COUNT: usize = 1;

    /// Hard cap on concurrent entry downloads
    pub const MAX_WORKER_COUNT: usize = 4;
}

/// Catalog policy defaults written into a freshly generated configuration
pub mod defaults {
    use super::Duration;

    /// How long a cached catalog entry is trusted without refetching
    pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    /// Developer name -> manufacturer listing paths
    pub const DEVELOPERS: &[(&str, &[&str])] = &[
        (
            "Cave",
            &[
                "Cave",
                "Cave+(AMI+license)",
                "Cave+(Atlus+license)",
                "Cave+(Capcom+license)",
                "Cave+(Nihon+System+license)",
            ],
        ),
        (
            "Raizing",
            &[
                "Raizing",
                "Raizing+%28Able+license%29",
                "Raizing+%28Unite+Trading+license%29",
                "Eighting+%252F+Raizing",
                "Eighting+%252F+Raizing+%28Capcom+license%29",
                "Raizing+%252F+Eighting",
            ],
        ),
        ("Toaplan", &["Toaplan"]),
        ("Psikyo", &["Psikyo"]),
        ("Irem", &["Irem", "Irem+(licensed+from+Broderbund)"]),
        ("Seibu Kaihatsu", &["Seibu+Kaihatsu"]),
        ("Konami", &["Konami", "Konami+(Centuri+license)"]),
        (
            "Taito",
            &[
                "Taito",
                "Taito+Corporation",
                "Taito+Corporation+Japan",
                "Taito+America+Corporation",
            ],
        ),
        ("Capcom", &["Capcom"]),
        ("SNK", &["SNK"]),
        ("Treasure", &["Treasure"]),
        (
            "Compile",
            &["Compile", "Compile+(Sega+license)", "Compile+%252F+Sega"],
        ),
        ("Technosoft", &["Technosoft"]),
        ("NMK", &["NMK", "NMK+(UPL+license)"]),
        ("Video System", &["Video+System+Co."]),
        ("Visco", &["Visco"]),
        ("Atlus", &["Atlus"]),
        ("Banpresto", &["Banpresto"]),
        ("Jaleco", &["Jaleco"]),
        ("Nichibutsu", &["Nihon+Bussan+Co.", "Nichibutsu"]),
    ];

    /// Title keywords marking non-shmup games
    pub const DENYLIST_KEYWORDS: &[&str] = &[
        // print club
        "print club", "pclub", "purikura",
        // sports
        "bowling", "golf", "tennis", "soccer", "football", "baseball", "basketball",
        "hockey", "racing", "rally", "derby", "kart",
        // fighting
        "street fighter", "fatal fury", "king of fighters", "tekken", "virtua fighter",
        "mortal kombat", "groove on fight", "power instinct", "gouketsuji",
        // puzzle
        "puzzle", "tetris", "columns", "puyo", "match",
        // mahjong
        "mahjong", "mahjon", "jan",
        // quiz
        "quiz", "trivia",
        // gambling and medal
        "pachinko", "pachislot", "slot", "casino", "medal", "poker", "roulette",
        // licensed characters
        "pokemon", "winnie", "pooh", "disney", "sanrio", "hello kitty",
        "pepsiman", "felix the cat",
        // misc
        "dance", "karaoke", "music", "beatmania", "ddr",
        "princess", "love", "dating",
        "billiard", "pool",
    ];

    /// Identifiers always dropped from listings
    pub const SKIP_IDENTIFIERS: &[&str] = &[
        // puzzle
        "uopoko", "uopokoj", "puzldama", "puzldamj", "hotgmck", "hotgmcki", "mjgtaste",
        "mushitam", "mushitama",
        // festival
        "fstgfish", "oygt", "oyks",
        // fighting
        "beastrzr", "beastrzra", "bldyroar", "bldyror2", "bldyror2a", "bldyror2j",
        "bldyror2u", "brvblade", "brvbladea", "brvbladej", "brvbladeu",
        // racing
        "btlkroad", "btlkroadk",
        "mmmbanc",
        // medal
        "loderndfa", "loderndf",
        // unsupported hardware
        "deathsm2",
        // bios
        "coh1002e",
        // light gun
        "ghunter", "golgo13", "g13knd", "g13jnr", "ghlpanic", "ohbakyuun",
    ];

    /// Horizontally scrolling games; everything else is treated as vertical
    pub const HORIZONTAL_GAMES: &[&str] = &[
        "gradius", "gradius2", "gradius3", "gradius4", "salamand", "salamand2", "lifefrce",
        "darius", "darius2", "dariusg", "rtype", "rtype2", "rtypelo", "xmultipl", "thunderx",
        "thunderxa", "parodius", "parodiusj", "twinbee", "twinbeeb", "gaiapols", "silentd",
        "silentdj", "blazstar", "pulstar", "contra", "contraj", "mslug", "mslug2", "mslug3",
        "mslug4", "mslug5", "mslugx",
    ];

    /// Display-name overrides keyed by identifier
    pub const DISPLAY_NAMES: &[(&str, &str)] = &[
        ("ddonpach", "DoDonPachi"),
        ("donpachi", "DonPachi"),
        ("dfeveron", "Dangun Feveron"),
        ("esprade", "ESP Ra.De."),
        ("guwange", "Guwange"),
        ("progear", "Progear"),
        ("mushisam", "Mushihime-Sama"),
        ("futari15", "Mushihime-Sama Futari"),
        ("futaribl", "Mushihime-Sama Futari Black Label"),
        ("espgal", "Espgaluda"),
        ("espgal2", "Espgaluda II"),
        ("deathsml", "Deathsmiles"),
        ("dsmbl", "Deathsmiles MegaBlack Label"),
        ("ddpdoj", "DoDonPachi Dai-Ou-Jou"),
        ("ddpdojblk", "DoDonPachi Dai-Ou-Jou Black Label"),
        ("ddpdfk", "DoDonPachi Dai-Fukkatsu"),
        ("dfkbl", "DoDonPachi Dai-Fukkatsu Black Label"),
        ("ket", "Ketsui"),
        ("ibara", "Ibara"),
        ("ibarablk", "Ibara Kuro Black Label"),
        ("pinkswts", "Pink Sweets"),
        ("mmpork", "Muchi Muchi Pork!"),
        ("akatana", "Akai Katana"),
        ("bgaregga", "Battle Garegga"),
        ("batrider", "Armed Police Batrider"),
        ("bbakraid", "Battle Bakraid"),
        ("sstriker", "Sorcer Striker"),
        ("mahoudai", "Mahou Daisakusen"),
        ("shippumd", "Shippu Mahou Daisakusen"),
        ("kingdmgp", "Kingdom Grandprix"),
        ("sokyugrt", "Soukyugurentai"),
        ("dimahoo", "Dimahoo"),
        ("gmahou", "Great Mahou Daisakusen"),
        ("batsugun", "Batsugun"),
        ("batsugunsp", "Batsugun Special Version"),
        ("truxton", "Truxton"),
        ("truxton2", "Truxton II"),
        ("vimana", "Vimana"),
        ("fireshrk", "Fire Shark"),
        ("hellfire", "Hellfire"),
        ("zerowing", "Zero Wing"),
        ("outzone", "Out Zone"),
        ("tatsujin", "Tatsujin"),
        ("samesame", "Same! Same! Same!"),
        ("gunbird", "Gunbird"),
        ("gunbird2", "Gunbird 2"),
        ("s1945", "Strikers 1945"),
        ("s1945ii", "Strikers 1945 II"),
        ("s1945iii", "Strikers 1945 III"),
        ("tengai", "Tengai"),
        ("dragnblz", "Dragon Blaze"),
        ("soldivid", "Sol Divide"),
        ("raiden", "Raiden"),
        ("raiden2", "Raiden II"),
        ("raidendx", "Raiden DX"),
        ("raidenf", "Raiden Fighters"),
        ("raidenf2", "Raiden Fighters 2"),
        ("rdft", "Raiden Fighters Jet"),
    ];
}

// Re-export commonly used constants for convenience
pub use files::{ARCHIVE_EXTENSION, TEMP_FILE_SUFFIX};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_RATE_LIMIT_RPS, MAX_ATTEMPTS, RETRY_BASE_DELAY_MS};
pub use workers::{DEFAULT_WORKER_COUNT, MAX_WORKER_COUNT};
