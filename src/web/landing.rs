use axum::{extract::State, response::Html};

use crate::web::{AppState, escape_html, render_footer};

/// Word formats the in-process reflow can read.
const REFLOW_WORD_ACCEPT: &str = ".docx";

const CONVERSIONS: [(&str, &str, &str, &str); 4] = [
    (
        "word",
        "Word → PDF",
        "Paragraph text from a .docx document, laid out as a printable PDF.",
        ".doc,.docx",
    ),
    (
        "excel",
        "Excel → PDF",
        "Spreadsheets rendered through the server's document engine.",
        ".xls,.xlsx",
    ),
    (
        "ppt",
        "PowerPoint → PDF",
        "Slide decks rendered through the server's document engine.",
        ".ppt,.pptx",
    ),
    (
        "jpg",
        "Image → PDF",
        "A JPEG or PNG image placed on a single PDF page.",
        ".jpg,.jpeg,.png",
    ),
];

pub async fn landing_page(State(state): State<AppState>) -> Html<String> {
    Html(render_main_page(state.dispatcher().renders_word()))
}

fn render_main_page(word_via_renderer: bool) -> String {
    let footer = render_footer();

    let cards = CONVERSIONS
        .iter()
        .map(|&(tag, title, description, accept)| {
            let accept = if tag == "word" && !word_via_renderer {
                REFLOW_WORD_ACCEPT
            } else {
                accept
            };
            format!(
                r#"<button type="button" class="convert-card" data-type="{tag}" data-accept="{accept}"><h2>{title}</h2><p>{description}</p><span class="cta">Choose file →</span></button>"#,
                tag = tag,
                accept = accept,
                title = escape_html(title),
                description = escape_html(description),
            )
        })
        .collect::<String>();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>pdfdesk · convert documents to PDF</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="robots" content="noindex,nofollow">
    <style>
        :root {{ color-scheme: light; }}
        body {{ font-family: "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; min-height: 100vh; display: flex; flex-direction: column; }}
        header {{ background: #ffffff; padding: clamp(2rem, 4vw, 2.75rem) clamp(1.5rem, 6vw, 3rem); border-bottom: 1px solid #e2e8f0; }}
        header h1 {{ margin: 0 0 0.5rem; font-size: clamp(1.9rem, 3vw, 2.4rem); }}
        header p {{ margin: 0; color: #64748b; }}
        main {{ flex: 1; padding: clamp(2rem, 5vw, 3rem); max-width: 1100px; margin: 0 auto; width: 100%; box-sizing: border-box; }}
        .convert-grid {{ display: grid; gap: 1.5rem; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); }}
        .convert-card {{ display: block; text-align: left; font: inherit; background: #ffffff; padding: 1.75rem; border-radius: 16px; color: inherit; cursor: pointer; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); transition: transform 0.15s ease, box-shadow 0.15s ease, border 0.15s ease; border: 1px solid #e2e8f0; }}
        .convert-card:hover {{ transform: translateY(-4px); box-shadow: 0 24px 55px rgba(15, 23, 42, 0.12); border-color: #bfdbfe; }}
        .convert-card:disabled {{ opacity: 0.6; cursor: progress; }}
        .convert-card h2 {{ margin-top: 0; margin-bottom: 0.75rem; font-size: 1.25rem; }}
        .convert-card p {{ margin: 0 0 1.25rem 0; color: #475569; font-size: 0.95rem; line-height: 1.6; }}
        .convert-card .cta {{ font-weight: 600; color: #2563eb; }}
        .status-box {{ margin-top: 2rem; padding: 1rem; border-radius: 12px; background: #f1f5f9; color: #0f172a; min-height: 3rem; }}
        .status-box.error {{ color: #b91c1c; }}
        .status-box.success {{ color: #166534; }}
        .status-box a {{ color: #2563eb; font-weight: 600; }}
        .app-footer {{ margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }}
    </style>
</head>
<body>
    <header>
        <h1>pdfdesk</h1>
        <p>Pick a conversion, then choose the file to upload.</p>
    </header>
    <main>
        <div class="convert-grid">
            {cards}
        </div>
        <div id="status" class="status-box">No conversion yet.</div>
        {footer}
    </main>
    <script>
        const statusBox = document.getElementById('status');
        const cards = document.querySelectorAll('.convert-card');

        const setStatus = (kind, html) => {{
            statusBox.className = 'status-box ' + kind;
            statusBox.innerHTML = html;
        }};

        const escapeText = (text) => {{
            const span = document.createElement('span');
            span.textContent = text;
            return span.innerHTML;
        }};

        const upload = async (type, file) => {{
            const formData = new FormData();
            formData.append('file', file);
            formData.append('type', type);

            cards.forEach((card) => {{ card.disabled = true; }});
            setStatus('', 'Converting ' + escapeText(file.name) + '…');
            try {{
                const response = await fetch('/upload', {{ method: 'POST', body: formData }});
                const result = await response.json().catch(() => ({{}}));
                if (response.ok) {{
                    setStatus('success', escapeText(result.message) + ' <a href="' + encodeURI(result.url) + '" target="_blank" rel="noopener">Open PDF</a>');
                    window.open(result.url, '_blank');
                }} else {{
                    setStatus('error', escapeText(result.error || 'Something went wrong!'));
                }}
            }} catch (error) {{
                console.error(error);
                setStatus('error', 'An error occurred while processing your file. Please try again.');
            }} finally {{
                cards.forEach((card) => {{ card.disabled = false; }});
            }}
        }};

        cards.forEach((card) => {{
            card.addEventListener('click', () => {{
                const input = document.createElement('input');
                input.type = 'file';
                input.accept = card.dataset.accept;
                input.onchange = () => {{
                    const file = input.files[0];
                    if (!file) {{
                        setStatus('error', 'No file selected. Please try again.');
                        return;
                    }}
                    upload(card.dataset.type, file);
                }};
                input.click();
            }});
        }});
    </script>
</body>
</html>"#,
        cards = cards,
        footer = footer,
    )
}
