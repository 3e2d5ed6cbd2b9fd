use iced::widget::{button, column, row, scrollable, text, Column, Space};
use iced::{Alignment, Element, Length};

use crate::state::tree::{DirNode, DirTree, NodeId};
use crate::Message;

/// Width of the tree pane
pub const TREE_VIEW_WIDTH: f32 = 200.0;

/// Indentation per nesting level
const INDENT: f32 = 14.0;

/// Side pane listing the visible nodes of the directory tree
pub fn view<'a>(tree: &'a DirTree, selected: Option<NodeId>) -> Element<'a, Message> {
    let rows: Vec<Element<'a, Message>> = tree
        .visible()
        .into_iter()
        .filter_map(|id| tree.node(id).map(|node| view_row(id, node, selected == Some(id))))
        .collect();

    let header = text("Gallery").size(16);

    scrollable(
        column![header, Column::with_children(rows).spacing(1)]
            .spacing(6)
            .padding(6),
    )
    .width(Length::Fixed(TREE_VIEW_WIDTH))
    .height(Length::Fill)
    .into()
}

fn view_row(id: NodeId, node: &DirNode, is_selected: bool) -> Element<'_, Message> {
    let toggle: Element<Message> = if node.has_children {
        let marker = if node.is_expanded() { "-" } else { "+" };
        button(text(marker).size(13))
            .on_press(Message::Toggle(id))
            .padding([0, 4])
            .style(button::text)
            .into()
    } else {
        Space::with_width(Length::Fixed(18.0)).into()
    };

    let label = button(text(&node.name).size(14))
        .on_press(Message::Activate(id))
        .padding([2, 4])
        .style(if is_selected {
            button::primary
        } else {
            button::text
        });

    row![
        Space::with_width(Length::Fixed(INDENT * node.depth as f32)),
        toggle,
        label,
    ]
    .align_y(Alignment::Center)
    .into()
}
