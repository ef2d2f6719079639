//! HTML fragments owned by the view layer.
//!
//! The structured editing form comes from the engine; everything here is
//! the small markup this layer produces itself: the raw-text editing form,
//! the modals, and entity escaping for anything interpolated into them.

use std::fmt::Write;

/// Escape text for safe interpolation into markup.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Raw-text editing form: hidden filename field + CodeMirror textarea.
/// Also the degraded response when a document's XML fails to parse.
pub fn text_form(filename: &str, content: &str, update_text_action: &str) -> String {
    format!(
        "<form id=\"xmltool-form\" class=\"no-tree\" data-action=\"{}\" method=\"POST\">\n\
         <input type=\"hidden\" id=\"_xml_filename\" name=\"filename\" value=\"{}\" />\n\
         <textarea class=\"codemirror\" name=\"filecontent\">{}</textarea>\n\
         </form>",
        escape(update_text_action),
        escape(filename),
        escape(content),
    )
}

/// "New file" selection prompt listing the configured DTD URLs.
pub fn new_file_modal(dtd_urls: &[String]) -> String {
    let mut options = String::new();
    for url in dtd_urls {
        let _ = write!(options, "<option value=\"{0}\">{0}</option>", escape(url));
    }
    format!(
        "<div class=\"modal fade\">\
         <div class=\"modal-dialog\"><div class=\"modal-content\">\
         <div class=\"modal-header\"><h4 class=\"modal-title\">New file</h4></div>\
         <div class=\"modal-body\">\
         <select name=\"dtd_url\">{options}</select>\
         <select name=\"dtd_tag\"></select>\
         </div>\
         <div class=\"modal-footer\">\
         <button type=\"submit\" class=\"btn btn-primary\">Create</button>\
         </div>\
         </div></div></div>"
    )
}

/// Commit-message prompt shown after a save with the commit flag set.
pub fn commit_modal() -> String {
    "<div class=\"modal fade\">\
     <div class=\"modal-dialog\"><div class=\"modal-content\">\
     <div class=\"modal-header\"><h4 class=\"modal-title\">Commit message</h4></div>\
     <div class=\"modal-body\">\
     <textarea name=\"commit_msg\" rows=\"5\"></textarea>\
     </div>\
     <div class=\"modal-footer\">\
     <button type=\"submit\" class=\"btn btn-primary\">Commit</button>\
     </div>\
     </div></div></div>"
        .to_string()
}

/// Comment editing fragment embedding the given comment text (or empty).
pub fn comment_modal(comment: &str) -> String {
    format!(
        "<div class=\"modal fade\">\
         <div class=\"modal-dialog\"><div class=\"modal-content\">\
         <div class=\"modal-header\"><h4 class=\"modal-title\">Comment</h4></div>\
         <div class=\"modal-body\">\
         <textarea name=\"comment\" rows=\"5\">{}</textarea>\
         </div>\
         <div class=\"modal-footer\">\
         <button type=\"submit\" class=\"btn btn-primary\">Save</button>\
         </div>\
         </div></div></div>",
        escape(comment),
    )
}
