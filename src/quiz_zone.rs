use anyhow::{bail, Context, Result};
use derive_builder::Builder;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const QUIZ_ZONE: &str = "https://www.quiz-zone.co.uk";
pub const QUESTIONS_DIR: &str = "questions";

/// Rows per results page on the site.
pub const PAGE_SIZE: usize = 20;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/39.0.2171.95 Safari/537.36";
const FETCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Builder, Serialize, Deserialize)]
pub struct QuizScraper {
    #[builder(default = "QUIZ_ZONE.to_string()")]
    base_url: String,
    #[builder(default = "PathBuf::from(QUESTIONS_DIR)")]
    out_dir: PathBuf,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub count: usize,
}

/// One question/answer row, serialized with the field names the quiz
/// player expects in the category JSON files.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct QuestionAnswer {
    #[serde(rename = "Quiz question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

impl QuizScraper {
    /// Crawl every category and write one `<category>.json` per category
    /// into the output directory. A failed category listing aborts the
    /// whole crawl; a failed results page only loses that page.
    pub async fn scrape(&self) -> Result<()> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        let categories = self.fetch_categories(&client).await?;
        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("creating {}", self.out_dir.display()))?;

        for (name, category) in &categories {
            info!("fetching {name:?} questions ({} advertised)", category.count);
            let questions = self.fetch_category(&client, name, category).await;
            let path = self.write_category(name, &questions)?;
            info!("wrote {} questions to {}", questions.len(), path.display());
        }
        Ok(())
    }

    async fn fetch_categories(
        &self,
        client: &reqwest::Client,
    ) -> Result<BTreeMap<String, Category>> {
        let url = format!("{}/questionsbycategory.html", self.base_url);
        let resp = client.get(&url).send().await?;
        if !resp.status().is_success() {
            bail!("failed to fetch categories: {}", resp.status());
        }
        parse_categories(&resp.text().await?)
    }

    async fn fetch_category(
        &self,
        client: &reqwest::Client,
        name: &str,
        category: &Category,
    ) -> Vec<QuestionAnswer> {
        let mut questions = vec![];
        for offset in page_offsets(category.count) {
            match self.fetch_questions(client, &category.key, offset).await {
                Ok(pairs) => questions.extend(pairs),
                Err(e) => warn!("skipping page at offset {offset} of {name:?}: {e:#}"),
            }
            tokio::time::sleep(FETCH_DELAY).await;
        }
        questions
    }

    async fn fetch_questions(
        &self,
        client: &reqwest::Client,
        key: &str,
        offset: usize,
    ) -> Result<Vec<QuestionAnswer>> {
        let url = format!(
            "{}/questionsbycategory/{}/{}/answers.html",
            self.base_url, key, offset
        );
        let resp = client.get(&url).send().await?;
        if !resp.status().is_success() {
            bail!("failed to fetch questions: {}", resp.status());
        }
        parse_questions(&resp.text().await?)
    }

    fn write_category(&self, name: &str, questions: &[QuestionAnswer]) -> Result<PathBuf> {
        let path = self.out_dir.join(format!("{name}.json"));
        let json = serde_json::to_string_pretty(questions)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// Offsets of the results pages fetched for a category advertising `count`
/// questions. The trailing partial page is never fetched, so 45 questions
/// means two pages of 20.
fn page_offsets(count: usize) -> impl Iterator<Item = usize> {
    (0..count / PAGE_SIZE).map(|page| page * PAGE_SIZE)
}

fn parse_categories(html: &str) -> Result<BTreeMap<String, Category>> {
    let document = Html::parse_document(html);
    let mut categories = BTreeMap::new();
    for link in document.select(&Selector::parse("a[href]").unwrap()) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(rest) = href.strip_prefix("questionsbycategory/") else {
            continue;
        };
        let key = rest.split('/').next().unwrap_or_default().to_string();

        // Link text reads "Name (N questions)"
        let text = link.text().collect::<String>();
        let (name, count) = text
            .split_once('(')
            .with_context(|| format!("malformed category link {text:?}"))?;
        let count = count
            .replace(')', "")
            .replace("questions", "")
            .trim()
            .parse()
            .with_context(|| format!("bad question count in {text:?}"))?;
        categories.insert(name.trim().to_string(), Category { key, count });
    }
    Ok(categories)
}

fn parse_questions(html: &str) -> Result<Vec<QuestionAnswer>> {
    let document = Html::parse_document(html);
    let table = document
        .select(&Selector::parse("table").unwrap())
        .next()
        .ok_or_else(|| anyhow::anyhow!("no results table found"))?;

    let question_sel = Selector::parse("span").unwrap();
    let answer_sel = Selector::parse("b").unwrap();

    let mut questions = vec![];
    // first row is the table header
    for row in table.select(&Selector::parse("tr").unwrap()).skip(1) {
        let question = row
            .select(&question_sel)
            .next()
            .ok_or_else(|| anyhow::anyhow!("row without question text"))?;
        let answer = row
            .select(&answer_sel)
            .next()
            .ok_or_else(|| anyhow::anyhow!("row without answer text"))?;
        questions.push(QuestionAnswer {
            question: node_text(question),
            answer: node_text(answer),
        });
    }
    Ok(questions)
}

// The site marks up quotes as backticks; normalize them to apostrophes.
fn node_text(node: ElementRef) -> String {
    node.text().collect::<Vec<_>>().join(" ").replace('`', "'")
}
