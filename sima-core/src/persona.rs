//! Persona catalogue
//!
//! The built-in historical figures, their prompt suggestions and the small
//! event table used by the timeline/map views.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Persona identifier (e.g. "ataturk")
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonaId(String);

impl PersonaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identifiers are lowercase ASCII with underscores, as the backend keys them
    pub fn is_well_formed(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 64
            && self.0.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PersonaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A historical event tied to a persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    pub id: String,
    pub title: String,
    pub date: String,
    pub location: Option<String>,
    pub significance: String,
}

/// A selectable historical figure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: String,
    pub personality: String,
    pub era: String,
    pub location: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub example_prompts: Vec<String>,
    #[serde(default)]
    pub events: Vec<HistoricalEvent>,
}

impl Persona {
    pub fn event(&self, event_id: &str) -> Option<&HistoricalEvent> {
        self.events.iter().find(|e| e.id == event_id)
    }

    /// System prompt the backend sends ahead of the user message
    pub fn system_prompt(&self) -> String {
        format!(
            "Sen {}sın. {} Tarihi gerçeklere dayalı olarak yanıt ver. Türkçe konuş.",
            self.name, self.personality
        )
    }
}

/// Prompts offered when a persona has no tailored list
pub const GENERIC_PROMPTS: &[&str] = &[
    "Bana hayatınız hakkında bilgi verir misiniz?",
    "En önemli başarınız nedir?",
    "Zamanınızda yaşam nasıldı?",
    "Bana bir hikaye anlatır mısınız?",
];

/// Catalogue of known personas keyed by id
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    personas: BTreeMap<PersonaId, Persona>,
}

impl PersonaCatalog {
    pub fn new(personas: impl IntoIterator<Item = Persona>) -> Self {
        Self {
            personas: personas.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// The three figures shipped with the application
    pub fn builtin() -> Self {
        Self::new([fatih_sultan_mehmet(), ataturk(), napoleon()])
    }

    pub fn get(&self, id: &str) -> Option<&Persona> {
        self.personas.get(&PersonaId::from(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn ids(&self) -> Vec<PersonaId> {
        self.personas.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn example_prompts(&self, id: &str) -> Vec<String> {
        match self.get(id) {
            Some(p) if !p.example_prompts.is_empty() => p.example_prompts.clone(),
            _ => GENERIC_PROMPTS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

fn event(id: &str, title: &str, date: &str, location: Option<&str>, significance: &str) -> HistoricalEvent {
    HistoricalEvent {
        id: id.to_string(),
        title: title.to_string(),
        date: date.to_string(),
        location: location.map(str::to_string),
        significance: significance.to_string(),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn fatih_sultan_mehmet() -> Persona {
    Persona {
        id: PersonaId::new("fatih_sultan_mehmet"),
        name: "Fatih Sultan Mehmet".to_string(),
        personality: "Ben Fatih Sultan Mehmet. 1453'te İstanbul'u fetheden Osmanlı padişahıyım. Bilim, sanat ve strateji konularında konuşmayı severim. Sert ama adil bir liderim.".to_string(),
        era: "15. yüzyıl".to_string(),
        location: "İstanbul, Osmanlı İmparatorluğu".to_string(),
        title: "Osmanlı Padişahı".to_string(),
        example_prompts: strings(&[
            "İstanbul'un fethi hakkında detaylı bilgi ver. Kuşatma stratejilerimi, kullandığım teknolojileri ve bu fethin tarihsel önemini anlat.",
            "Şahi toplarının yapım sürecini, teknik özelliklerini ve kuşatmada nasıl kullandığımı detaylı anlat.",
            "Gemileri karadan yürütme operasyonunu nasıl planladım ve gerçekleştirdim? Bu stratejinin kuşatmaya etkisini anlat.",
            "İstanbul'u nasıl bir bilim ve sanat merkezi haline getirdim? Hangi bilim insanlarını korudum ve nasıl destekledim?",
            "Kanunname-i Âl-i Osman'ın içeriğini ve Osmanlı hukuk sistemine katkılarını detaylı anlat.",
        ]),
        events: vec![
            event("birth", "Doğum", "1432", Some("Edirne"), "Osmanlı İmparatorluğu'nun en büyük hükümdarlarından birinin dünyaya gelişi"),
            event("cannon_construction", "Şahi Topunun Dökümü", "1452", Some("Edirne"), "Savaş teknolojisinde devrim"),
            event("constantinople_conquest", "İstanbul Fethi", "1453", Some("İstanbul"), "Orta Çağ'ın sonu ve Yeni Çağ'ın başlangıcı"),
            event("cultural_renaissance", "Kültürel Rönesans", "1453-1481", Some("İstanbul"), "Doğu ve Batı kültürlerinin sentezi"),
        ],
    }
}

fn ataturk() -> Persona {
    Persona {
        id: PersonaId::new("ataturk"),
        name: "Mustafa Kemal Atatürk".to_string(),
        personality: "Ben Mustafa Kemal Atatürk. Türkiye Cumhuriyeti'nin kurucusu ve ilk cumhurbaşkanıyım. Modernleşme, eğitim ve bağımsızlık konularında tutkulu bir liderim.".to_string(),
        era: "19-20. yüzyıl".to_string(),
        location: "Ankara, Türkiye".to_string(),
        title: "Türkiye Cumhuriyeti'nin Kurucusu".to_string(),
        example_prompts: strings(&[
            "Kurtuluş Savaşı'nı nasıl başlattım? Samsun'a çıkışımın önemi ve sonrasında yaptığım çalışmaları detaylı anlat.",
            "Sakarya Meydan Muharebesi'nin stratejisini, önemini ve sonuçlarını detaylı anlat.",
            "Cumhuriyet'in ilan sürecini, nedenlerini ve Türkiye'ye getirdiği değişiklikleri anlat.",
            "Harf devriminin nedenlerini, sürecini ve Türk eğitimine etkilerini detaylı anlat.",
            "Kadın hakları konusundaki reformlarımı ve bu hakların Türk toplumuna etkilerini anlat.",
        ]),
        events: vec![
            event("samsun", "Samsun'a Çıkış", "1919", Some("Samsun"), "Kurtuluş Savaşı'nın başlangıcı"),
            event("sakarya", "Sakarya Meydan Muharebesi", "1921", Some("Sakarya"), "Savunmadan taarruza geçişin dönüm noktası"),
            event("republic", "Cumhuriyetin İlanı", "1923", Some("Ankara"), "Yeni Türk devletinin kuruluşu"),
            event("alphabet_reform", "Harf Devrimi", "1928", None, "Okuryazarlığın hızla yayılması"),
        ],
    }
}

fn napoleon() -> Persona {
    Persona {
        id: PersonaId::new("napoleon"),
        name: "Napolyon Bonaparte".to_string(),
        personality: "Ben Napolyon Bonaparte. Fransız İmparatoru ve büyük bir askeri dehayım. Strateji, savaş ve yönetim konularında uzmanım.".to_string(),
        era: "18-19. yüzyıl".to_string(),
        location: "Paris, Fransa".to_string(),
        title: "Fransız İmparatoru".to_string(),
        example_prompts: strings(&[
            "Austerlitz Savaşı'nın stratejisini, taktiklerimi ve bu zaferin askeri tarihteki önemini detaylı anlat.",
            "Napoleon Kanunları'nın içeriğini, özelliklerini ve dünya hukuk sistemine etkilerini anlat.",
            "İtalya Seferi'ndeki stratejilerimi, zaferlerimi ve bu seferin kariyerime etkilerini anlat.",
            "Mısır Seferi'nin amaçlarını, bilimsel keşiflerini ve tarihsel önemini anlat.",
            "Waterloo Savaşı'nın nedenlerini, sürecini ve bu yenilginin sonuçlarını anlat.",
        ]),
        events: vec![
            event("egypt_campaign", "Mısır Seferi", "1798", Some("Kahire"), "Rosetta Taşı'nın keşfi ve Mısırbilimin doğuşu"),
            event("coronation", "İmparatorluk Taç Giyme", "1804", Some("Paris"), "Fransız İmparatorluğu'nun kuruluşu"),
            event("austerlitz", "Austerlitz Savaşı", "1805", Some("Austerlitz"), "Üç İmparator Savaşı'nda kesin zafer"),
            event("waterloo", "Waterloo Savaşı", "1815", Some("Waterloo"), "Napolyon döneminin sonu"),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_has_three_figures() {
        let catalog = PersonaCatalog::builtin();
        assert_eq!(catalog.len(), 3);
        assert!(catalog.contains("ataturk"));
        assert!(catalog.contains("napoleon"));
        assert!(catalog.contains("fatih_sultan_mehmet"));
        assert!(catalog.ids().iter().all(|id| id.is_well_formed()));
    }

    #[test]
    fn test_example_prompts_fall_back_to_generic() {
        let catalog = PersonaCatalog::builtin();
        assert_eq!(catalog.example_prompts("ataturk").len(), 5);
        assert_eq!(catalog.example_prompts("cleopatra").len(), GENERIC_PROMPTS.len());
    }

    #[test]
    fn test_system_prompt_mentions_name() {
        let catalog = PersonaCatalog::builtin();
        let napoleon = catalog.get("napoleon").unwrap();
        assert!(napoleon.system_prompt().starts_with("Sen Napolyon Bonaparte"));
        assert!(napoleon.event("waterloo").is_some());
        assert!(napoleon.event("samsun").is_none());
    }

    #[test]
    fn test_persona_id_well_formed() {
        assert!(PersonaId::from("fatih_sultan_mehmet").is_well_formed());
        assert!(!PersonaId::from("Ataturk").is_well_formed());
        assert!(!PersonaId::from("").is_well_formed());
        assert!(!PersonaId::from("a/b").is_well_formed());
    }
}
