//! Localized console messages and language / mode selection.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::conversation::AnalysisMode;

/// Languages with a message catalog. Reports are generated in the same language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Turkish,
}

impl Language {
    /// Name used in the report-language directive.
    pub fn name(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Turkish => "Turkish",
        }
    }

    pub fn parse(input: &str) -> Option<Language> {
        match input.trim().to_lowercase().as_str() {
            "english" | "en" | "ingilizce" | "i̇ngilizce" => Some(Language::English),
            "turkish" | "tr" | "türkçe" | "turkce" => Some(Language::Turkish),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a free-text answer was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<T> {
    Chosen(T),
    /// Empty answer.
    Defaulted(T),
    /// Answer did not match any option.
    Unrecognized(T),
}

impl<T: Copy> Selection<T> {
    pub fn value(&self) -> T {
        match *self {
            Selection::Chosen(v) | Selection::Defaulted(v) | Selection::Unrecognized(v) => v,
        }
    }
}

pub fn resolve_language(input: &str) -> Selection<Language> {
    if input.trim().is_empty() {
        return Selection::Defaulted(Language::default());
    }
    match Language::parse(input) {
        Some(language) => Selection::Chosen(language),
        None => Selection::Unrecognized(Language::default()),
    }
}

pub fn resolve_mode(input: &str) -> Selection<AnalysisMode> {
    match input.trim().to_lowercase().as_str() {
        "" => Selection::Defaulted(AnalysisMode::default()),
        "1" | "meeting" | "toplantı" | "toplanti" => Selection::Chosen(AnalysisMode::Meeting),
        "2" | "general" | "genel" => Selection::Chosen(AnalysisMode::General),
        _ => Selection::Unrecognized(AnalysisMode::default()),
    }
}

/// Message templates for one UI language.
pub trait Messages: Send + Sync {
    fn prompt_language(&self) -> String;
    fn defaulting_language(&self) -> String;
    fn unknown_language(&self, input: &str) -> String;
    fn language_confirmed(&self, language: Language) -> String;
    fn prompt_mode(&self) -> String;
    fn defaulting_mode(&self, mode: AnalysisMode) -> String;
    fn mode_confirmed(&self, mode: AnalysisMode) -> String;
    fn processing(&self, path: &Path, model: &str, batches: usize) -> String;
    fn no_batches(&self) -> String;
    fn extracting(&self) -> String;
    fn uploading(&self) -> String;
    fn analyzing(&self) -> String;
    fn step(&self, batch: usize, total: usize, action: &str) -> String;
    fn upload_failed(&self, error: &str) -> String;
    fn api_overloaded(&self, delay: Duration, attempt: u32, max: u32) -> String;
    fn unrecoverable_error(&self, error: &str) -> String;
    fn batch_failed(&self, attempts: u32) -> String;
    fn limit_reached(&self, limit: usize) -> String;
    fn elapsed(&self) -> String;
    fn eta(&self) -> String;
    fn final_report(&self) -> String;
    fn no_report(&self) -> String;
    fn cleanup(&self) -> String;
    fn cleanup_complete(&self) -> String;
    fn process_error(&self, error: &str) -> String;
    fn video_not_found(&self, path: &Path) -> String;
    fn finished(&self, elapsed: Duration) -> String;
}

pub struct English;

pub struct Turkish;

impl Messages for English {
    fn prompt_language(&self) -> String {
        "In which language should the analysis be generated? (e.g., English, Turkish)".into()
    }
    fn defaulting_language(&self) -> String {
        "No language provided. Defaulting to English.".into()
    }
    fn unknown_language(&self, input: &str) -> String {
        format!("'{}' is not supported. Defaulting to English.", input.trim())
    }
    fn language_confirmed(&self, language: Language) -> String {
        format!("Analysis report will be generated in: {}.", language)
    }
    fn prompt_mode(&self) -> String {
        "Which analysis mode? [1] meeting (default), [2] general".into()
    }
    fn defaulting_mode(&self, mode: AnalysisMode) -> String {
        format!("Using the default analysis mode: {}.", mode)
    }
    fn mode_confirmed(&self, mode: AnalysisMode) -> String {
        format!("Analysis mode: {}.", mode)
    }
    fn processing(&self, path: &Path, model: &str, batches: usize) -> String {
        format!(
            "Processing '{}' with {} in {} batch(es)...",
            path.display(),
            model,
            batches
        )
    }
    fn no_batches(&self) -> String {
        "The video is empty; nothing to analyze.".into()
    }
    fn extracting(&self) -> String {
        "Extracting frames and audio...".into()
    }
    fn uploading(&self) -> String {
        "Uploading audio...".into()
    }
    fn analyzing(&self) -> String {
        "Analyzing".into()
    }
    fn step(&self, batch: usize, total: usize, action: &str) -> String {
        format!("[Batch {}/{}] {}", batch, total, action)
    }
    fn upload_failed(&self, error: &str) -> String {
        format!("Audio upload failed, skipping this batch: {}", error)
    }
    fn api_overloaded(&self, delay: Duration, attempt: u32, max: u32) -> String {
        format!(
            "API is overloaded (503). Retrying in {}s... (Attempt {}/{})",
            delay.as_secs_f64(),
            attempt,
            max
        )
    }
    fn unrecoverable_error(&self, error: &str) -> String {
        format!("An unrecoverable API error occurred: {}", error)
    }
    fn batch_failed(&self, attempts: u32) -> String {
        format!("Failed to process batch after {} attempt(s).", attempts)
    }
    fn limit_reached(&self, limit: usize) -> String {
        format!("Request limit of {} reached. Stopping analysis.", limit)
    }
    fn elapsed(&self) -> String {
        "Elapsed".into()
    }
    fn eta(&self) -> String {
        "ETA".into()
    }
    fn final_report(&self) -> String {
        "--- FINAL CUMULATIVE ANALYSIS REPORT ---".into()
    }
    fn no_report(&self) -> String {
        "No batch was analyzed successfully; there is no report.".into()
    }
    fn cleanup(&self) -> String {
        "Cleaning up uploaded files and temporary folders...".into()
    }
    fn cleanup_complete(&self) -> String {
        "Cleanup complete.".into()
    }
    fn process_error(&self, error: &str) -> String {
        format!("An error occurred during the process: {}", error)
    }
    fn video_not_found(&self, path: &Path) -> String {
        format!("Error: Video file not found: '{}'.", path.display())
    }
    fn finished(&self, elapsed: Duration) -> String {
        format!(
            "Process finished. Total time: {:.2} seconds.",
            elapsed.as_secs_f64()
        )
    }
}

impl Messages for Turkish {
    fn prompt_language(&self) -> String {
        "Analiz hangi dilde oluşturulsun? (Örn: Türkçe, English)".into()
    }
    fn defaulting_language(&self) -> String {
        "Dil belirtilmedi. Varsayılan olarak İngilizce seçildi.".into()
    }
    fn unknown_language(&self, input: &str) -> String {
        format!(
            "'{}' desteklenmiyor. Varsayılan olarak İngilizce seçildi.",
            input.trim()
        )
    }
    fn language_confirmed(&self, language: Language) -> String {
        let name = match language {
            Language::English => "İngilizce",
            Language::Turkish => "Türkçe",
        };
        format!("Analiz raporu şu dilde oluşturulacak: {}.", name)
    }
    fn prompt_mode(&self) -> String {
        "Analiz türü? [1] toplantı (varsayılan), [2] genel".into()
    }
    fn defaulting_mode(&self, mode: AnalysisMode) -> String {
        format!("Varsayılan analiz türü kullanılıyor: {}.", mode_name_tr(mode))
    }
    fn mode_confirmed(&self, mode: AnalysisMode) -> String {
        format!("Analiz türü: {}.", mode_name_tr(mode))
    }
    fn processing(&self, path: &Path, model: &str, batches: usize) -> String {
        format!(
            "'{}' dosyası {} ile {} grup halinde işleniyor...",
            path.display(),
            model,
            batches
        )
    }
    fn no_batches(&self) -> String {
        "Video boş; analiz edilecek bir şey yok.".into()
    }
    fn extracting(&self) -> String {
        "Kareler ve ses çıkarılıyor...".into()
    }
    fn uploading(&self) -> String {
        "Ses yükleniyor...".into()
    }
    fn analyzing(&self) -> String {
        "Analiz ediliyor".into()
    }
    fn step(&self, batch: usize, total: usize, action: &str) -> String {
        format!("[Grup {}/{}] {}", batch, total, action)
    }
    fn upload_failed(&self, error: &str) -> String {
        format!("Ses yüklenemedi, bu grup atlanıyor: {}", error)
    }
    fn api_overloaded(&self, delay: Duration, attempt: u32, max: u32) -> String {
        format!(
            "API aşırı yüklü (503). {} saniye içinde tekrar denenecek... (Deneme {}/{})",
            delay.as_secs_f64(),
            attempt,
            max
        )
    }
    fn unrecoverable_error(&self, error: &str) -> String {
        format!("Kurtarılamayan bir API hatası oluştu: {}", error)
    }
    fn batch_failed(&self, attempts: u32) -> String {
        format!("Grup, {} deneme sonunda işlenemedi.", attempts)
    }
    fn limit_reached(&self, limit: usize) -> String {
        format!(
            "{} olan istek limitine ulaşıldı. Analiz durduruluyor.",
            limit
        )
    }
    fn elapsed(&self) -> String {
        "Geçen Süre".into()
    }
    fn eta(&self) -> String {
        "Tahmini Kalan Süre".into()
    }
    fn final_report(&self) -> String {
        "--- NİHAİ KÜMÜLATİF ANALİZ RAPORU ---".into()
    }
    fn no_report(&self) -> String {
        "Hiçbir grup başarıyla analiz edilemedi; rapor yok.".into()
    }
    fn cleanup(&self) -> String {
        "Yüklenen dosyalar ve geçici klasörler temizleniyor...".into()
    }
    fn cleanup_complete(&self) -> String {
        "Temizlik tamamlandı.".into()
    }
    fn process_error(&self, error: &str) -> String {
        format!("Süreç boyunca bir hata meydana geldi: {}", error)
    }
    fn video_not_found(&self, path: &Path) -> String {
        format!("Hata: Video dosyası bulunamadı: '{}'.", path.display())
    }
    fn finished(&self, elapsed: Duration) -> String {
        format!(
            "İşlem tamamlandı. Toplam süre: {:.2} saniye.",
            elapsed.as_secs_f64()
        )
    }
}

fn mode_name_tr(mode: AnalysisMode) -> &'static str {
    match mode {
        AnalysisMode::Meeting => "toplantı",
        AnalysisMode::General => "genel",
    }
}

pub fn catalog(language: Language) -> &'static dyn Messages {
    match language {
        Language::English => &English,
        Language::Turkish => &Turkish,
    }
}
