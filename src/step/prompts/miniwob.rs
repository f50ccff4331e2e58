//! MiniWoB 策略：根策略 miniwob_agent 与若干可复用子策略

use crate::step::policy::{PolicyEntry, PolicyTemplate};
use crate::step::prompts::instruction;

const LOW_LEVEL: &str = "click [id]: click the element with the given id\n\
type [id] [text]: type text into the element with the given id\n\
stop [answer]: finish the current task, optionally reporting a result";

pub fn policies() -> Vec<PolicyEntry> {
    vec![
        PolicyEntry::shared(
            "miniwob_agent",
            PolicyTemplate::new(instruction(
                "You are an agent solving tasks on a simple web page. Break the objective into \
                sub-tasks when a matching sub-task exists, otherwise act directly on the page.",
                &format!(
                    "{LOW_LEVEL}\n\
                    fill_text [field and value]: fill one text field\n\
                    choose_date [date]: pick a date in a date picker\n\
                    find_and_click_search_link [link]: search result link navigation\n\
                    find_and_click_tab_link [link]: open a tab and click a link inside it\n\
                    process_email [instruction]: reply to, forward or delete an email"
                ),
            ))
            .with_example(
                "OBJECTIVE:\nEnter \"Kasey\" into the text field and press Submit.\nURL:\nhttp://localhost/miniwob/enter-text.html\nOBSERVATION:\n<input id=4 val= /><button id=5 val=Submit />\nPREVIOUS ACTIONS:\nNone",
                "REASON:\nThe name must go into the text field first.\nACTION:\nfill_text [Enter \"Kasey\" into field 4]",
            ),
        ),
        PolicyEntry::shared(
            "fill_text",
            PolicyTemplate::new(instruction(
                "You fill a single text field. Type the value into the field, then stop.",
                LOW_LEVEL,
            ))
            .with_example(
                "OBJECTIVE:\nfill_text [Enter \"Kasey\" into field 4]\nURL:\nhttp://localhost/miniwob/enter-text.html\nOBSERVATION:\n<input id=4 val= />\nPREVIOUS ACTIONS:\nNone",
                "REASON:\nField 4 is the target text field.\nACTION:\ntype [4] [Kasey]",
            ),
        ),
        PolicyEntry::shared(
            "choose_date",
            PolicyTemplate::new(instruction(
                "You choose a date in a date picker. Open the picker, move to the right month \
                with the prev/next controls, click the day, then stop.",
                LOW_LEVEL,
            )),
        ),
        PolicyEntry::shared(
            "find_and_click_search_link",
            PolicyTemplate::new(instruction(
                "You find a link among paginated search results. Search, page through the \
                results until the requested link is visible, click it, then stop.",
                LOW_LEVEL,
            )),
        ),
        PolicyEntry::shared(
            "find_and_click_tab_link",
            PolicyTemplate::new(instruction(
                "You find a link hidden in one of several tabs. Open tabs one by one until the \
                link is visible, click it, then stop.",
                LOW_LEVEL,
            )),
        ),
        PolicyEntry::shared(
            "process_email",
            PolicyTemplate::new(instruction(
                "You act on an email in an inbox: find the email from the named sender, open it \
                and reply, forward, star or delete it as instructed, then stop.",
                LOW_LEVEL,
            )),
        ),
    ]
}
