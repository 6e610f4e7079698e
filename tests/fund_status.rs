mod common;

use cmvr_render::compose::FUND_STATUS_LABEL;
use cmvr_render::model::PageGeometry;
use cmvr_render::pdf::{DrawOp, GROUP_TITLE_TEXT};

#[tokio::test]
async fn label_is_printed_once_per_page_segment() {
    let renderer = common::renderer(common::StaticImages::default());
    let laid_out = renderer
        .layout_cmvr(&common::fund_only_report(2, 40, 1))
        .await
        .expect("layout");

    let first_word = FUND_STATUS_LABEL.split_whitespace().next().expect("label");
    let mut pages_with_label = 0;
    for page in &laid_out.pages {
        let count = common::page_texts(page)
            .iter()
            .filter(|t| t.starts_with(first_word))
            .count();
        assert!(count <= 1, "label printed {count} times on one page");
        pages_with_label += count;
    }
    assert!(pages_with_label >= 2, "fund table should span pages");
}

#[tokio::test]
async fn section_borders_open_and_close_once() {
    let renderer = common::renderer(common::StaticImages::default());
    let laid_out = renderer
        .layout_cmvr(&common::fund_only_report(2, 40, 1))
        .await
        .expect("layout");

    let page = PageGeometry::cmvr();
    let left = page.margins.left;
    let right = left + page.usable_width();
    let merged_right = left + page.usable_width() * 0.23;

    let mut full_width = Vec::new();
    let mut label_width = 0;
    let mut segment_pages = 0;
    for (i, p) in laid_out.pages.iter().enumerate() {
        let mut on_page = false;
        for (x1, x2, _) in common::horizontal_lines(p) {
            if !common::approx(x1, left) {
                continue;
            }
            on_page = true;
            if common::approx(x2, right) {
                full_width.push(i);
            } else if common::approx(x2, merged_right) {
                label_width += 1;
            }
        }
        if on_page {
            segment_pages += 1;
        }
    }

    // Top of the section on the first page, bottom on the last.
    assert_eq!(full_width.len(), 2, "full-width borders on pages {full_width:?}");
    assert_eq!(full_width[0], 0);
    assert_eq!(full_width[1], segment_pages - 1);
    // Every break closes the label below and reopens it above.
    assert_eq!(label_width, 2 * (segment_pages - 1));
}

#[tokio::test]
async fn every_group_gets_a_title_row() {
    let renderer = common::renderer(common::StaticImages::default());
    let laid_out = renderer
        .layout_cmvr(&common::fund_only_report(2, 40, 1))
        .await
        .expect("layout");

    let titles: Vec<&str> = laid_out
        .pages
        .iter()
        .flat_map(|p| p.texts())
        .filter(|(_, style)| *style == GROUP_TITLE_TEXT)
        .map(|(t, _)| t)
        .collect();
    for expected in ["Rehabilitation", "Monitoring Trust", "Final Mine"] {
        assert!(
            titles.iter().any(|t| t.starts_with(expected)),
            "no group title starting with {expected}: {titles:?}"
        );
    }

    // Forty MTF holders: every one of them is printed.
    let names = common::all_texts(&laid_out.pages)
        .into_iter()
        .filter(|t| t.starts_with("MTF HOLDER"))
        .count();
    assert_eq!(names, 40);
}

#[tokio::test]
async fn empty_groups_render_a_placeholder_row() {
    let renderer = common::renderer(common::StaticImages::default());
    let laid_out = renderer
        .layout_cmvr(&common::fund_only_report(0, 0, 0))
        .await
        .expect("layout");

    assert_eq!(laid_out.pages.len(), 1);
    let texts = common::page_texts(&laid_out.pages[0]);
    assert_eq!(texts.iter().filter(|t| **t == "N/A").count(), 3);
    let images = laid_out.pages[0]
        .ops
        .iter()
        .filter(|op| matches!(op, DrawOp::Image { .. }))
        .count();
    assert_eq!(images, 0);
}

#[tokio::test]
async fn group_title_and_header_never_end_a_page() {
    let renderer = common::renderer(common::StaticImages::default());
    // Slide the MTF group across the page bottom one RCF row at a time.
    for rcf in 1..=79 {
        let laid_out = renderer
            .layout_cmvr(&common::fund_only_report(rcf, 3, 1))
            .await
            .expect("layout");
        for (i, page) in laid_out.pages.iter().enumerate() {
            let texts = common::page_texts(page);
            for (title, row) in [
                ("Monitoring Trust Fund", "MTF HOLDER"),
                ("Final Mine Rehabilitation", "FMRDF HOLDER"),
            ] {
                if texts.iter().any(|t| t.starts_with(title)) {
                    assert!(
                        texts.iter().any(|t| t.starts_with(row)),
                        "rcf={rcf}: {title} title on page {} without rows",
                        i + 1
                    );
                }
            }
        }
    }
}

#[tokio::test]
async fn holder_names_taller_than_a_page_are_split() {
    let renderer = common::renderer(common::StaticImages::default());
    let mut report = common::fund_only_report(2, 2, 1);
    let name = (0..400).map(|i| format!("holder{i}")).collect::<Vec<_>>().join(" ");
    if let Some(funds) = report.fund_status.as_mut()
        && let Some(rcf) = funds.rcf.as_mut()
    {
        rcf[1].permit_holder_name = Some(name);
    }
    let laid_out = renderer.layout_cmvr(&report).await.expect("layout");

    let limit = laid_out.bottom_limit();
    let first_word = FUND_STATUS_LABEL.split_whitespace().next().expect("label");
    for (i, page) in laid_out.pages.iter().enumerate() {
        assert!(common::lowest_body_baseline(page) <= limit, "text below the limit on page {}", i + 1);
        assert!(common::lowest_ink(page) <= limit + 0.01, "borders below the limit on page {}", i + 1);
        let labels = common::page_texts(page)
            .iter()
            .filter(|t| t.starts_with(first_word))
            .count();
        assert!(labels <= 1);
    }
    // Names are upper-cased in the table.
    assert_eq!(common::numbered_words(&laid_out.pages, "HOLDER").len(), 400);
    let texts = common::all_texts(&laid_out.pages);
    assert!(texts.iter().any(|t| t.starts_with("MTF HOLDER 1")));
    assert!(texts.iter().any(|t| t.starts_with("FMRDF HOLDER 0")));
}
