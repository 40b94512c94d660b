use crate::dom::{Dom, NodeId};
use crate::html::parse_html;
use crate::locator::resolve_select;
use crate::options::{default_select_value, find_option_value, OptionSpec};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// A form's `method` attribute, case-insensitive, defaulting to GET when
    /// absent or unrecognized.
    fn from_attr(attr: Option<&str>) -> Self {
        match attr {
            Some(value) if value.eq_ignore_ascii_case("post") => Self::Post,
            _ => Self::Get,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// The request a real browser would issue for one submit click. Built once
/// per click, handed to the [`Transport`], never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub method: Method,
    pub action: String,
    pub params: Vec<(String, String)>,
}

/// The collaborator that actually performs requests and follows redirects.
/// Both variants return the body of the page the browser would end up on.
pub trait Transport {
    fn get_via_redirect(&mut self, action: &str, params: &[(String, String)]) -> Result<String>;
    fn post_via_redirect(&mut self, action: &str, params: &[(String, String)]) -> Result<String>;
}

/// In-memory transport double: records every dispatched submission and
/// answers with a canned body.
#[derive(Debug, Default)]
pub struct MockTransport {
    pub calls: Vec<(Method, String, Vec<(String, String)>)>,
    pub next_body: String,
}

impl MockTransport {
    pub fn respond_with(body: impl Into<String>) -> Self {
        Self {
            calls: Vec::new(),
            next_body: body.into(),
        }
    }

    pub fn last_call(&self) -> Option<&(Method, String, Vec<(String, String)>)> {
        self.calls.last()
    }
}

impl Transport for MockTransport {
    fn get_via_redirect(&mut self, action: &str, params: &[(String, String)]) -> Result<String> {
        self.calls
            .push((Method::Get, action.to_string(), params.to_vec()));
        Ok(self.next_body.clone())
    }

    fn post_via_redirect(&mut self, action: &str, params: &[(String, String)]) -> Result<String> {
        self.calls
            .push((Method::Post, action.to_string(), params.to_vec()));
        Ok(self.next_body.clone())
    }
}

// One simulated step: Idle on load, Interacting after any select, Submitted
// once the submission has been built. Submitted is terminal until a new page
// is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepState {
    Idle,
    Interacting,
    Submitted,
}

#[derive(Debug)]
struct Page {
    dom: Dom,
    url: String,
    // Explicitly chosen field values, in interaction order. Untouched
    // controls are defaulted lazily when the submission is built.
    chosen: Vec<(String, String)>,
    state: StepState,
}

/// A simulated browsing session over server-rendered form pages.
///
/// Owns one parsed page at a time plus the values the test has explicitly
/// chosen on it. [`Session::click_submit`] reconciles those choices with the
/// document's own defaults, dispatches through the transport, and loads the
/// response as the next page.
#[derive(Debug)]
pub struct Session<T> {
    transport: T,
    page: Option<Page>,
    trace: Vec<String>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            page: None,
            trace: Vec::new(),
        }
    }

    pub fn load_page(&mut self, html: &str) -> Result<()> {
        self.load_page_with_url("/", html)
    }

    /// Parses a response body as the current page, discarding any previous
    /// page and its chosen values.
    pub fn load_page_with_url(&mut self, url: &str, html: &str) -> Result<()> {
        let dom = parse_html(html)?;
        self.trace.push(format!("[page] load url={url}"));
        self.page = Some(Page {
            dom,
            url: url.to_string(),
            chosen: Vec::new(),
            state: StepState::Idle,
        });
        Ok(())
    }

    pub fn current_url(&self) -> Result<&str> {
        self.page
            .as_ref()
            .map(|page| page.url.as_str())
            .ok_or_else(|| Error::InvalidState("no page loaded".into()))
    }

    /// Picks an option from a select, like a user opening the list and
    /// clicking an entry. `locator` names the select by `name`, `id`, or
    /// associated label text; pass `None` when the page has exactly one.
    ///
    /// A failed call leaves the chosen-value table untouched.
    pub fn select_option(
        &mut self,
        spec: impl Into<OptionSpec>,
        locator: Option<&str>,
    ) -> Result<()> {
        let spec = spec.into();
        let page = self.interactable_page()?;

        let select = resolve_select(&page.dom, locator)?;
        let control = control_label(&page.dom, select, locator);
        let value = find_option_value(&page.dom, select, &spec, &control)?;

        let name = page.dom.attr(select, "name").unwrap_or_default();
        if name.is_empty() {
            return Err(Error::InvalidState(format!(
                "select '{control}' has no name attribute"
            )));
        }

        record(&mut page.chosen, name.clone(), value.clone());
        page.state = StepState::Interacting;
        self.trace
            .push(format!("[select] {name}='{value}' locator={control}"));
        Ok(())
    }

    /// The submission that clicking the page's submit button would produce,
    /// without dispatching it. Useful for asserting on the parameter set.
    pub fn build_submission(&self) -> Result<Submission> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| Error::InvalidState("no page loaded".into()))?;
        let trigger = find_submit_control(&page.dom)?;
        build_submission(&page.dom, &page.chosen, trigger)
    }

    /// Clicks the page's submit button: builds the submission, dispatches it
    /// through the transport (GET or POST per the form's method), and loads
    /// the body the transport returns as the next page.
    pub fn click_submit(&mut self) -> Result<()> {
        let page = self.interactable_page()?;
        let trigger = find_submit_control(&page.dom)?;
        let submission = build_submission(&page.dom, &page.chosen, trigger)?;
        page.state = StepState::Submitted;

        self.trace.push(format!(
            "[submit] {} {} params={}",
            submission.method.as_str(),
            submission.action,
            submission.params.len()
        ));

        let body = match submission.method {
            Method::Get => self
                .transport
                .get_via_redirect(&submission.action, &submission.params)?,
            Method::Post => self
                .transport
                .post_via_redirect(&submission.action, &submission.params)?,
        };

        self.load_page_with_url(&submission.action, &body)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Drains the session trace: one line per page load, selection, and
    /// submission, in order.
    pub fn take_trace_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.trace)
    }

    fn interactable_page(&mut self) -> Result<&mut Page> {
        let page = self
            .page
            .as_mut()
            .ok_or_else(|| Error::InvalidState("no page loaded".into()))?;
        if page.state == StepState::Submitted {
            return Err(Error::InvalidState(
                "page already submitted; load a new page first".into(),
            ));
        }
        Ok(page)
    }
}

fn record(chosen: &mut Vec<(String, String)>, name: String, value: String) {
    if let Some(slot) = chosen.iter_mut().find(|(existing, _)| *existing == name) {
        slot.1 = value;
    } else {
        chosen.push((name, value));
    }
}

fn control_label(dom: &Dom, select: NodeId, locator: Option<&str>) -> String {
    if let Some(locator) = locator {
        return locator.to_string();
    }
    dom.attr(select, "name")
        .or_else(|| dom.attr(select, "id"))
        .unwrap_or_else(|| "<unnamed select>".to_string())
}

fn find_submit_control(dom: &Dom) -> Result<NodeId> {
    dom.all_element_nodes()
        .into_iter()
        .find(|node| is_submit_control(dom, *node))
        .ok_or_else(|| Error::ControlNotFound("<submit button>".to_string()))
}

fn is_submit_control(dom: &Dom, node: NodeId) -> bool {
    let Some(tag) = dom.tag_name(node) else {
        return false;
    };

    if tag.eq_ignore_ascii_case("button") {
        // A button with no type attribute submits.
        return dom
            .attr(node, "type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(true);
    }

    if tag.eq_ignore_ascii_case("input") {
        return dom
            .attr(node, "type")
            .map(|kind| kind.eq_ignore_ascii_case("submit"))
            .unwrap_or(false);
    }

    false
}

/// Merges explicitly chosen values with structural defaults for every select
/// in the trigger's form, in document order, then reads the form's method and
/// action. Later duplicate names overwrite earlier ones, matching standard
/// form-encoding semantics.
fn build_submission(
    dom: &Dom,
    chosen: &[(String, String)],
    trigger: NodeId,
) -> Result<Submission> {
    let form = dom
        .find_ancestor_by_tag(trigger, "form")
        .ok_or_else(|| Error::NoEnclosingForm(describe_node(dom, trigger)))?;

    let mut params: Vec<(String, String)> = Vec::new();
    for select in dom.descendants_by_tag(form, "select") {
        let name = dom.attr(select, "name").unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let value = chosen
            .iter()
            .find(|(chosen_name, _)| *chosen_name == name)
            .map(|(_, value)| value.clone())
            .unwrap_or_else(|| default_select_value(dom, select));
        record(&mut params, name, value);
    }

    Ok(Submission {
        method: Method::from_attr(dom.attr(form, "method").as_deref()),
        action: dom.attr(form, "action").unwrap_or_default(),
        params,
    })
}

fn describe_node(dom: &Dom, node: NodeId) -> String {
    let tag = dom.tag_name(node).unwrap_or("<node>");
    match dom.attr(node, "id").or_else(|| dom.attr(node, "name")) {
        Some(label) => format!("{tag} '{label}'"),
        None => tag.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{MockTransport, Session};
    use crate::{Error, Method, Result};

    #[test]
    fn interaction_before_any_page_load_is_rejected() {
        let mut session = Session::new(MockTransport::default());
        assert!(matches!(
            session.select_option("January", Some("month")),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn submitted_page_rejects_further_interactions_until_reload() -> Result<()> {
        // The submit response is a page without any select, so a second
        // interaction must fail against the new document, and re-submitting
        // the stale step must be impossible.
        let html = r#"
        <form method="post" action="/login">
          <select name="month"><option value="1">January</option></select>
          <input type="submit">
        </form>
        "#;
        let mut session = Session::new(MockTransport::respond_with("<p>done</p>"))
            .into_loaded(html)?;
        session.click_submit()?;
        assert_eq!(session.current_url()?, "/login");
        assert!(matches!(
            session.select_option("January", Some("month")),
            Err(Error::ControlNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn repeated_selection_overwrites_the_previous_choice() -> Result<()> {
        let html = r#"
        <form method="post" action="/login">
          <select name="month">
            <option value="1">January</option>
            <option value="2">February</option>
          </select>
          <input type="submit">
        </form>
        "#;
        let mut session = Session::new(MockTransport::default()).into_loaded(html)?;
        session.select_option("January", Some("month"))?;
        session.select_option("February", Some("month"))?;
        let submission = session.build_submission()?;
        assert_eq!(
            submission.params,
            vec![("month".to_string(), "2".to_string())]
        );
        Ok(())
    }

    #[test]
    fn failed_selection_leaves_no_trace_in_the_submission() -> Result<()> {
        let html = r#"
        <form method="post" action="/login">
          <select name="month"><option value="1">January</option></select>
          <input type="submit">
        </form>
        "#;
        let mut session = Session::new(MockTransport::default()).into_loaded(html)?;
        assert!(session.select_option("February", Some("month")).is_err());
        let submission = session.build_submission()?;
        // The untouched default, not a partial record from the failed call.
        assert_eq!(
            submission.params,
            vec![("month".to_string(), "1".to_string())]
        );
        Ok(())
    }

    #[test]
    fn submit_control_outside_any_form_is_rejected() -> Result<()> {
        let mut session = Session::new(MockTransport::default())
            .into_loaded("<input type='submit' id='lonely'>")?;
        assert!(matches!(
            session.click_submit(),
            Err(Error::NoEnclosingForm(_))
        ));
        Ok(())
    }

    #[test]
    fn missing_submit_control_is_control_not_found() -> Result<()> {
        let mut session = Session::new(MockTransport::default())
            .into_loaded("<form action='/x'><select name='m'></select></form>")?;
        assert!(matches!(
            session.click_submit(),
            Err(Error::ControlNotFound(_))
        ));
        Ok(())
    }

    #[test]
    fn method_attribute_is_read_case_insensitively() -> Result<()> {
        let html = r#"
        <form method="POST" action="/login">
          <select name="m"><option value="1">One</option></select>
          <button>Go</button>
        </form>
        "#;
        let mut session = Session::new(MockTransport::default()).into_loaded(html)?;
        session.click_submit()?;
        let (method, action, _) = session
            .transport()
            .last_call()
            .expect("one dispatch")
            .clone();
        assert_eq!(method, Method::Post);
        assert_eq!(action, "/login");
        Ok(())
    }

    #[test]
    fn missing_method_defaults_to_get() -> Result<()> {
        let html = r#"
        <form action="/search">
          <select name="q"><option>all</option></select>
          <input type="submit">
        </form>
        "#;
        let mut session = Session::new(MockTransport::default()).into_loaded(html)?;
        session.click_submit()?;
        let (method, _, params) = session
            .transport()
            .last_call()
            .expect("one dispatch")
            .clone();
        assert_eq!(method, Method::Get);
        assert_eq!(params, vec![("q".to_string(), "all".to_string())]);
        Ok(())
    }

    #[test]
    fn only_the_enclosing_form_contributes_parameters() -> Result<()> {
        let html = r#"
        <form method="post" action="/a">
          <select name="first"><option value="1">One</option></select>
          <input type="submit">
        </form>
        <form method="post" action="/b">
          <select name="second"><option value="2">Two</option></select>
        </form>
        "#;
        let mut session = Session::new(MockTransport::default()).into_loaded(html)?;
        session.click_submit()?;
        let (_, action, params) = session
            .transport()
            .last_call()
            .expect("one dispatch")
            .clone();
        assert_eq!(action, "/a");
        assert_eq!(params, vec![("first".to_string(), "1".to_string())]);
        Ok(())
    }

    #[test]
    fn duplicate_select_names_keep_the_later_value() -> Result<()> {
        let html = r#"
        <form method="post" action="/dup">
          <select name="m"><option value="early">E</option></select>
          <select name="m"><option value="late">L</option></select>
          <input type="submit">
        </form>
        "#;
        let mut session = Session::new(MockTransport::default()).into_loaded(html)?;
        session.click_submit()?;
        let (_, _, params) = session
            .transport()
            .last_call()
            .expect("one dispatch")
            .clone();
        assert_eq!(params, vec![("m".to_string(), "late".to_string())]);
        Ok(())
    }

    #[test]
    fn trace_records_loads_selections_and_submissions() -> Result<()> {
        let html = r#"
        <form method="post" action="/login">
          <select name="month"><option value="1">January</option></select>
          <input type="submit">
        </form>
        "#;
        let mut session = Session::new(MockTransport::default()).into_loaded(html)?;
        session.select_option("January", Some("month"))?;
        session.click_submit()?;
        let trace = session.take_trace_logs();
        assert_eq!(trace[0], "[page] load url=/");
        assert_eq!(trace[1], "[select] month='1' locator=month");
        assert_eq!(trace[2], "[submit] POST /login params=1");
        assert_eq!(trace[3], "[page] load url=/login");
        assert!(session.take_trace_logs().is_empty());
        Ok(())
    }

    impl Session<MockTransport> {
        fn into_loaded(mut self, html: &str) -> Result<Self> {
            self.load_page(html)?;
            Ok(self)
        }
    }
}
