//! OCR and image-table extraction through the `tesseract` command-line tool.

use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::model::{ChartData, Element, ImageRef, Origin, Region};
use crate::parser::{TableDetector, TextSpan};
use crate::text::TextCleaner;

use super::{ImageInput, ImageTableBackend, OcrBackend};

const NAME: &str = "tesseract";

/// Words in image ids or paths that mark an image as a chart.
const DEFAULT_CHART_HINTS: &[&str] = &["chart", "graph", "plot"];

/// How often a running tesseract process is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Images with more words than this are treated as text, not charts.
const MAX_CHART_WORDS: usize = 60;

/// One recognized word from Tesseract's TSV output.
#[derive(Debug, Clone, PartialEq)]
pub struct TsvWord {
    pub block: u32,
    pub paragraph: u32,
    pub line: u32,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    /// 0-100
    pub confidence: f32,
    pub text: String,
}

impl TsvWord {
    fn line_key(&self) -> (u32, u32, u32) {
        (self.block, self.paragraph, self.line)
    }
}

/// Parse Tesseract TSV output into word rows.
///
/// Columns: level page_num block_num par_num line_num word_num left top width
/// height conf text. Only level 5 (word) rows with text and a non-negative
/// confidence are kept.
pub fn parse_tsv(tsv: &str) -> Vec<TsvWord> {
    let mut words = Vec::new();

    for line in tsv.lines().skip(1) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }
        if fields[0].trim() != "5" {
            continue;
        }

        let Ok(confidence) = fields[10].trim().parse::<f32>() else {
            continue;
        };
        let text = fields[11].trim();
        if confidence < 0.0 || text.is_empty() {
            continue;
        }

        let number = |i: usize| fields[i].trim().parse::<f32>().ok();
        let index = |i: usize| fields[i].trim().parse::<u32>().ok();
        let (Some(block), Some(paragraph), Some(line_num)) = (index(2), index(3), index(4)) else {
            continue;
        };
        let (Some(left), Some(top), Some(width), Some(height)) =
            (number(6), number(7), number(8), number(9))
        else {
            continue;
        };

        words.push(TsvWord {
            block,
            paragraph,
            line: line_num,
            left,
            top,
            width,
            height,
            confidence,
            text: text.to_string(),
        });
    }

    words
}

/// Wait for `child`, killing it once `limit` has passed.
///
/// Returns `None` when the process was killed.
fn wait_with_deadline(child: &mut Child, limit: Option<Duration>) -> std::io::Result<Option<ExitStatus>> {
    let Some(limit) = limit else {
        return child.wait().map(Some);
    };
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            // The process may exit between the check and the kill
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Everything written to a captured output file.
fn read_all(file: &mut std::fs::File) -> Result<String> {
    let mut bytes = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Tesseract invoked as an external process.
#[derive(Debug, Clone)]
pub struct Tesseract {
    binary: PathBuf,
    psm: Option<u8>,
    chart_hints: Vec<String>,
    timeout: Option<Duration>,
}

impl Tesseract {
    /// Use `tesseract` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            psm: None,
            chart_hints: DEFAULT_CHART_HINTS.iter().map(|s| s.to_string()).collect(),
            timeout: Some(Duration::from_secs(60)),
        }
    }

    /// Use a specific executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Page segmentation mode passed as `--psm`.
    pub fn with_psm(mut self, psm: u8) -> Self {
        self.psm = Some(psm);
        self
    }

    /// Replace the words that mark an image as a chart.
    pub fn with_chart_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chart_hints = hints.into_iter().map(|h| h.into().to_lowercase()).collect();
        self
    }

    /// Kill a tesseract run that takes longer than this (`None` waits forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether the executable can be started.
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Run OCR on an image and return the recognized words.
    fn recognize(&self, image: &ImageRef, languages: &[String]) -> Result<Vec<TsvWord>> {
        if !image.is_decodable() {
            return Err(Error::unavailable(
                NAME,
                format!("cannot read {} ({})", image.id, image.mime_type),
            ));
        }

        let mut file = tempfile::Builder::new()
            .prefix("hybridpdf-")
            .suffix(&format!(".{}", image.extension()))
            .tempfile()?;
        file.write_all(&image.data)?;
        file.flush()?;

        let langs = if languages.is_empty() {
            crate::config::DEFAULT_OCR_LANGUAGE.to_string()
        } else {
            languages.join("+")
        };

        let mut stdout = tempfile::tempfile()?;
        let mut stderr = tempfile::tempfile()?;

        let mut command = Command::new(&self.binary);
        command.arg(file.path()).arg("stdout").args(["-l", &langs]);
        if let Some(psm) = self.psm {
            command.args(["--psm", &psm.to_string()]);
        }
        command
            .arg("tsv")
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout.try_clone()?))
            .stderr(Stdio::from(stderr.try_clone()?));

        log::debug!("Running tesseract on {} with languages {}", image.id, langs);
        let mut child = command.spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::unavailable(
                NAME,
                format!("{} not found; install tesseract-ocr", self.binary.display()),
            ),
            _ => Error::failure(NAME, e),
        })?;

        let status = match wait_with_deadline(&mut child, self.timeout).map_err(|e| Error::failure(NAME, e))? {
            Some(status) => status,
            None => {
                let elapsed = self.timeout.unwrap_or_default();
                log::warn!("tesseract on {} killed after {:?}", image.id, elapsed);
                return Err(Error::BackendTimeout {
                    backend: NAME.to_string(),
                    elapsed,
                });
            }
        };

        if !status.success() {
            let message = read_all(&mut stderr)?;
            return Err(Error::failure(
                NAME,
                format!("exit status {}: {}", status, message.trim()),
            ));
        }

        Ok(parse_tsv(&read_all(&mut stdout)?))
    }

    fn has_chart_hint(&self, image: &ImageRef) -> bool {
        let id = image.id.to_lowercase();
        let path = image.path.as_deref().unwrap_or_default().to_lowercase();
        self.chart_hints
            .iter()
            .any(|hint| id.contains(hint.as_str()) || path.contains(hint.as_str()))
    }

    /// Tables (or a chart) found among OCR words.
    fn tables_from_words(&self, words: &[TsvWord], input: &ImageInput) -> Vec<Element> {
        if words.is_empty() {
            return Vec::new();
        }
        let size = image_size(&input.image, words);

        // Flip to a y-up space so the detector sees PDF-like coordinates
        let spans: Vec<TextSpan> = words
            .iter()
            .map(|w| {
                let r = Region::from_pixels(w.left, w.top, w.width, w.height, size, &input.region);
                let font_size = r.height().max(1.0);
                TextSpan::new(w.text.clone(), r.x0, -r.y1 + font_size * 0.2, font_size, NAME.to_string())
                    .with_width(r.width())
            })
            .collect();

        let (tables, _) = TableDetector::new().detect(spans);
        let cleaner = TextCleaner::global();
        let elements: Vec<Element> = tables
            .into_iter()
            .map(|table| {
                let rows = table
                    .cells
                    .iter()
                    .map(|row| row.iter().map(|c| cleaner.clean_inline(c)).collect())
                    .collect();
                let region = Region::new(table.rect.left, -table.rect.top, table.rect.right, -table.rect.bottom);
                Element::table(Origin::Ocr, NAME, rows).with_region(region)
            })
            .collect();

        if !elements.is_empty() {
            return elements;
        }

        if self.has_chart_hint(&input.image) || looks_like_chart(words) {
            let chart = ChartData {
                image: Some(input.image.id.clone()),
                data: line_rows(words),
            };
            return vec![Element::chart(Origin::Ocr, NAME, chart).with_region(input.region)];
        }

        Vec::new()
    }
}

impl Default for Tesseract {
    fn default() -> Self {
        Self::new()
    }
}

impl OcrBackend for Tesseract {
    fn name(&self) -> &str {
        NAME
    }

    fn run_ocr(&self, image: &ImageInput, languages: &[String]) -> Result<Vec<Element>> {
        let words = self.recognize(&image.image, languages)?;
        Ok(words_to_blocks(&words, image))
    }
}

impl ImageTableBackend for Tesseract {
    fn name(&self) -> &str {
        NAME
    }

    fn extract_tables_from_image(&self, image: &ImageInput) -> Result<Vec<Element>> {
        let words = self.recognize(&image.image, &[])?;
        Ok(self.tables_from_words(&words, image))
    }
}

/// Pixel size of the image, falling back to the extent of the words.
fn image_size(image: &ImageRef, words: &[TsvWord]) -> (u32, u32) {
    if let Some(size) = image.dimensions() {
        return size;
    }
    if let Ok(decoded) = ::image::load_from_memory(&image.data) {
        return (decoded.width(), decoded.height());
    }
    let right = words.iter().map(|w| w.left + w.width).fold(1.0f32, f32::max);
    let bottom = words.iter().map(|w| w.top + w.height).fold(1.0f32, f32::max);
    (right.ceil() as u32, bottom.ceil() as u32)
}

/// Group words by (block, paragraph) into text elements.
fn words_to_blocks(words: &[TsvWord], input: &ImageInput) -> Vec<Element> {
    if words.is_empty() {
        return Vec::new();
    }
    let size = image_size(&input.image, words);
    let cleaner = TextCleaner::global();

    let mut groups: Vec<Vec<&TsvWord>> = Vec::new();
    for word in words {
        match groups.last_mut() {
            Some(group) if group[0].block == word.block && group[0].paragraph == word.paragraph => {
                group.push(word)
            }
            _ => groups.push(vec![word]),
        }
    }

    groups
        .into_iter()
        .filter_map(|group| {
            let mut text = String::new();
            let mut current_line = None;
            for word in &group {
                if current_line.is_some_and(|key| key != word.line_key()) {
                    text.push('\n');
                } else if current_line.is_some() {
                    text.push(' ');
                }
                text.push_str(&word.text);
                current_line = Some(word.line_key());
            }

            let text = cleaner.clean_block(&text);
            if text.is_empty() {
                return None;
            }

            let region = group
                .iter()
                .map(|w| Region::from_pixels(w.left, w.top, w.width, w.height, size, &input.region))
                .reduce(|a, b| a.union(&b))?;
            let confidence =
                group.iter().map(|w| w.confidence).sum::<f32>() / group.len() as f32 / 100.0;

            Some(
                Element::text(Origin::Ocr, NAME, text)
                    .with_region(region)
                    .with_confidence(confidence),
            )
        })
        .collect()
}

/// Words of each OCR line, in order.
fn line_rows(words: &[TsvWord]) -> Vec<Vec<String>> {
    let mut rows: Vec<((u32, u32, u32), Vec<String>)> = Vec::new();
    for word in words {
        match rows.last_mut() {
            Some((key, row)) if *key == word.line_key() => row.push(word.text.clone()),
            _ => rows.push((word.line_key(), vec![word.text.clone()])),
        }
    }
    rows.into_iter().map(|(_, row)| row).collect()
}

/// Sparse labels dominated by numbers read as axis ticks and data labels.
fn looks_like_chart(words: &[TsvWord]) -> bool {
    if words.is_empty() || words.len() > MAX_CHART_WORDS {
        return false;
    }
    let numeric = words.iter().filter(|w| is_numeric_label(&w.text)).count();
    numeric >= 3 && numeric * 2 >= words.len()
}

fn is_numeric_label(text: &str) -> bool {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, ',' | '%' | '$' | '€' | '£'))
        .collect();
    !cleaned.is_empty() && cleaned.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn word(block: u32, par: u32, line: u32, left: f32, top: f32, text: &str) -> TsvWord {
        TsvWord {
            block,
            paragraph: par,
            line,
            left,
            top,
            width: text.len() as f32 * 10.0,
            height: 20.0,
            confidence: 90.0,
            text: text.to_string(),
        }
    }

    fn input(id: &str) -> ImageInput {
        let image = ImageRef::new(id, "image/png", vec![1]).with_dimensions(1000, 1000);
        ImageInput::new(image, Region::new(0.0, 0.0, 500.0, 500.0))
    }

    #[test]
    fn test_parse_tsv_keeps_words_only() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t\n\
             4\t1\t1\t1\t1\t0\t10\t10\t200\t20\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t96.5\tHello\n\
             5\t1\t1\t1\t1\t2\t70\t10\t60\t20\t91\tworld\n\
             5\t1\t1\t1\t1\t3\t140\t10\t5\t20\t95\t \n\
             5\t1\t1\t1\t1\t4\t150\t10\t5\t20\t-1\tnoise\n\
             garbage line"
        );
        let words = parse_tsv(&tsv);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text, "Hello");
        assert_eq!(words[0].left, 10.0);
        assert!((words[0].confidence - 96.5).abs() < f32::EPSILON);
        assert_eq!(words[1].line_key(), (1, 1, 1));
    }

    #[test]
    fn test_parse_tsv_empty() {
        assert!(parse_tsv("").is_empty());
        assert!(parse_tsv(HEADER).is_empty());
    }

    #[test]
    fn test_words_to_blocks_groups_paragraphs() {
        let words = vec![
            word(1, 1, 1, 100.0, 100.0, "First"),
            word(1, 1, 1, 170.0, 100.0, "line"),
            word(1, 1, 2, 100.0, 130.0, "second"),
            word(2, 1, 1, 100.0, 400.0, "Another"),
        ];
        let blocks = words_to_blocks(&words, &input("p1_raster"));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].as_text(), Some("First line\nsecond"));
        assert_eq!(blocks[0].origin, Origin::Ocr);
        assert!((blocks[0].confidence.unwrap() - 0.9).abs() < 1e-4);

        // 1000px image over a 500pt region: half scale
        let region = blocks[0].region.unwrap();
        assert_eq!(region.x0, 50.0);
        assert_eq!(region.y0, 50.0);
    }

    #[test]
    fn test_words_to_table() {
        let words = vec![
            word(1, 1, 1, 100.0, 100.0, "Item"),
            word(1, 1, 1, 400.0, 100.0, "Qty"),
            word(1, 1, 2, 100.0, 140.0, "Apples"),
            word(1, 1, 2, 400.0, 140.0, "3"),
            word(1, 1, 3, 100.0, 180.0, "Pears"),
            word(1, 1, 3, 400.0, 180.0, "7"),
        ];
        let tesseract = Tesseract::new();
        let elements = tesseract.tables_from_words(&words, &input("p1_Im1"));
        assert_eq!(elements.len(), 1);
        let grid = elements[0].as_grid().unwrap();
        assert_eq!(grid[0], vec!["Item".to_string(), "Qty".to_string()]);
        assert_eq!(grid[2], vec!["Pears".to_string(), "7".to_string()]);

        let region = elements[0].region.unwrap();
        assert!(region.y0 < region.y1);
        assert!(region.y0 >= 49.0 && region.y1 <= 101.0);
    }

    #[test]
    fn test_chart_from_numeric_labels() {
        let words = vec![
            word(1, 1, 1, 10.0, 10.0, "100"),
            word(1, 1, 2, 10.0, 60.0, "50"),
            word(1, 1, 3, 10.0, 110.0, "0"),
            word(1, 1, 4, 80.0, 160.0, "2023"),
            word(1, 1, 4, 300.0, 160.0, "Revenue"),
        ];
        let elements = Tesseract::new().tables_from_words(&words, &input("p3_Im2"));
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, crate::model::ElementKind::Chart);
    }

    #[test]
    fn test_chart_hint_in_image_id() {
        let words = vec![word(1, 1, 1, 10.0, 10.0, "Sales")];
        let tesseract = Tesseract::new();
        let elements = tesseract.tables_from_words(&words, &input("sales_chart"));
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].kind, crate::model::ElementKind::Chart);

        assert!(tesseract.tables_from_words(&words, &input("p1_Im1")).is_empty());
    }

    #[test]
    fn test_is_numeric_label() {
        assert!(is_numeric_label("1,200"));
        assert!(is_numeric_label("45%"));
        assert!(is_numeric_label("$3.50"));
        assert!(!is_numeric_label("Q1"));
        assert!(!is_numeric_label("%"));
    }

    #[test]
    fn test_undecodable_image_unavailable() {
        let image = ImageRef::new("p1_raster", "application/octet-stream", vec![0, 1, 2]);
        let result = Tesseract::new().recognize(&image, &["eng".to_string()]);
        assert!(matches!(result, Err(Error::BackendUnavailable { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_process_is_killed() {
        let mut child = Command::new("sleep").arg("5").spawn().unwrap();
        let started = Instant::now();
        let status = wait_with_deadline(&mut child, Some(Duration::from_millis(50))).unwrap();
        assert!(status.is_none());
        assert!(started.elapsed() < Duration::from_secs(2));
        // Reaped: nothing left to wait for
        assert!(child.try_wait().unwrap().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_finished_process_status() {
        let mut child = Command::new("true").spawn().unwrap();
        let status = wait_with_deadline(&mut child, Some(Duration::from_secs(5))).unwrap();
        assert!(status.is_some_and(|s| s.success()));
    }

    #[test]
    fn test_missing_binary_unavailable() {
        let tesseract = Tesseract::new().with_binary("/nonexistent/tesseract-bin");
        assert!(!tesseract.is_available());
        let image = ImageRef::new("p1_raster", "image/png", vec![0x89, b'P', b'N', b'G']);
        let result = tesseract.recognize(&image, &["eng".to_string()]);
        assert!(matches!(result, Err(Error::BackendUnavailable { .. })));
    }
}
