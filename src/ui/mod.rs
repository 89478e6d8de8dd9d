mod components;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{App, Popup, Section};
use crate::dashboard::view::{self, ProposalSection, ViewState, EMPTY_PROPOSALS_BODY, EMPTY_PROPOSALS_TITLE};
use crate::dashboard::{shorten_hex, unix_now, LiveDao};
use crate::theme::Theme;
use components::{format_countdown, format_eth, format_wei_str, vote_tally, voting_window};

pub fn draw<D, P>(f: &mut Frame, app: &App<D, P>) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(6),    // Dashboard body
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);

    match app.view_state() {
        ViewState::Error => draw_error(f, app, chunks[1]),
        ViewState::Loading => draw_notice(f, &app.theme, chunks[1], "Loading your DAOs…"),
        ViewState::Unconnected => draw_unconnected(f, &app.theme, chunks[1]),
        ViewState::Loaded(daos) => draw_dashboard(f, app, daos, chunks[1]),
    }

    draw_footer(f, app, chunks[2]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::Connect => draw_connect_popup(f, app),
        Popup::Help => draw_help_popup(f, &app.theme),
    }
}

fn draw_info_line<D, P>(f: &mut Frame, app: &App<D, P>, area: Rect) {
    let theme = &app.theme;

    // Priority: refresh in flight > status message > connected account > idle
    let line = if let Some(activity) = app.activity() {
        Line::from(vec![
            Span::styled("󰑓 ", Style::default().fg(theme.warning)),
            Span::styled(activity, Style::default().fg(theme.warning)),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(vec![Span::styled(status, Style::default().fg(theme.warning))])
    } else if let Some(ref address) = app.address {
        Line::from(vec![
            Span::styled("󰇅 ", Style::default().fg(theme.accent)),
            Span::styled(address.short(), Style::default().fg(theme.text)),
        ])
    } else {
        Line::from(vec![Span::styled("Not connected", Style::default().fg(theme.text_dim))])
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_notice(f: &mut Frame, theme: &Theme, area: Rect, message: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.inactive));

    let notice = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(theme.text_dim))),
    ])
    .alignment(Alignment::Center)
    .block(block);

    f.render_widget(notice, area);
}

fn draw_unconnected(f: &mut Frame, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.inactive));

    let notice = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("No account connected", Style::default().fg(theme.text))),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(theme.text_dim)),
            Span::styled("c", Style::default().fg(theme.accent)),
            Span::styled(" to enter a wallet address", Style::default().fg(theme.text_dim)),
        ]),
    ])
    .alignment(Alignment::Center)
    .block(block);

    f.render_widget(notice, area);
}

fn draw_error<D, P>(f: &mut Frame, app: &App<D, P>, area: Rect) {
    let theme = &app.theme;
    let block = Block::default()
        .title(Span::styled(" Error ", Style::default().fg(theme.danger)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.danger));

    // Details go to the log only
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Failed to load your dashboard",
            Style::default().fg(theme.danger).add_modifier(Modifier::BOLD),
        )),
    ];
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Press ", Style::default().fg(theme.text_dim)),
        Span::styled("R", Style::default().fg(theme.accent)),
        Span::styled(" to retry", Style::default().fg(theme.text_dim)),
    ]));

    let error = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(block);

    f.render_widget(error, area);
}

fn draw_dashboard<D, P>(f: &mut Frame, app: &App<D, P>, daos: &[LiveDao], area: Rect) {
    let sections = view::sections(daos);

    // Auction table gets one row per DAO plus header and borders
    let auctions_height = (sections.auction_cards.len() as u16 + 3).min(area.height / 2).max(4);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(auctions_height), Constraint::Min(4)])
        .split(area);

    draw_auctions_box(f, app, sections.auction_cards, chunks[0]);
    match sections.proposals {
        ProposalSection::Live(blocks) => draw_proposals_box(f, app, &blocks, chunks[1]),
        ProposalSection::Empty => draw_empty_proposals(f, app, chunks[1]),
    }
}

fn section_block<'a>(theme: &Theme, title: &'a str, is_active: bool) -> Block<'a> {
    let border_color = if is_active { theme.accent } else { theme.inactive };
    let title_style = if is_active {
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.inactive)
    };

    Block::default()
        .title(Span::styled(title, title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
}

fn draw_auctions_box<D, P>(f: &mut Frame, app: &App<D, P>, cards: &[LiveDao], area: Rect) {
    let theme = &app.theme;
    let is_active = app.section == Section::Auctions;
    let block = section_block(theme, " Auctions ", is_active);
    let now = unix_now();

    // Responsive columns based on width
    let show_chain = area.width > 90;

    let mut header_cells = vec![
        Span::styled("DAO", Style::default().fg(theme.header)),
        Span::styled("Token", Style::default().fg(theme.header)),
        Span::styled("Highest bid", Style::default().fg(theme.header)),
        Span::styled("Min bid", Style::default().fg(theme.header)),
        Span::styled("Ends", Style::default().fg(theme.header)),
    ];
    if show_chain {
        header_cells.insert(1, Span::styled("Chain", Style::default().fg(theme.header)));
    }

    let rows: Vec<Row> = cards
        .iter()
        .enumerate()
        .map(|(i, dao)| {
            let auction = &dao.current_auction;
            let highest = auction.highest_bid_wei().ok().flatten();

            let (bid_text, bid_color) = match (&auction.highest_bid, highest) {
                (Some(bid), Some(amount)) => (
                    format!("{} by {}", format_eth(amount), shorten_hex(&bid.bidder)),
                    theme.success,
                ),
                (None, _) => ("No bids".to_string(), theme.text_dim),
                (Some(bid), None) => (format_wei_str(&bid.amount), theme.text_dim),
            };

            let min_bid = dao
                .auction_config
                .minimum_next_bid(highest)
                .map(format_eth)
                .unwrap_or_else(|_| "-".to_string());

            let (ends_text, ends_color) = if auction.has_ended(now) {
                ("Ended".to_string(), theme.danger)
            } else {
                (format_countdown(auction.seconds_remaining(now)), theme.text)
            };

            let row_style = if i == app.selected_card && is_active {
                Style::default().bg(theme.bg_selected).fg(theme.text)
            } else {
                Style::default()
            };

            let mut cells = vec![
                Span::styled(dao.name.clone(), Style::default().fg(theme.text).add_modifier(Modifier::BOLD)),
                Span::styled(auction.token.name.clone(), Style::default().fg(theme.text)),
                Span::styled(bid_text, Style::default().fg(bid_color)),
                Span::styled(min_bid, Style::default().fg(theme.text_dim)),
                Span::styled(ends_text, Style::default().fg(ends_color)),
            ];
            if show_chain {
                cells.insert(1, Span::styled(dao.chain_id.to_string(), Style::default().fg(theme.text_dim)));
            }

            Row::new(cells).style(row_style)
        })
        .collect();

    let widths = if show_chain {
        vec![
            Constraint::Percentage(18),
            Constraint::Percentage(12),
            Constraint::Percentage(18),
            Constraint::Percentage(24),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
        ]
    } else {
        vec![
            Constraint::Percentage(20),
            Constraint::Percentage(20),
            Constraint::Percentage(28),
            Constraint::Percentage(16),
            Constraint::Percentage(16),
        ]
    };

    let table = Table::new(rows, widths)
        .header(Row::new(header_cells))
        .block(block);

    f.render_widget(table, area);
}

fn draw_proposals_box<D, P>(f: &mut Frame, app: &App<D, P>, blocks: &[&LiveDao], area: Rect) {
    let theme = &app.theme;
    let is_active = app.section == Section::Proposals;
    let block = section_block(theme, " Proposals ", is_active);
    let now = unix_now();

    let header = Row::new(vec![
        Span::styled("#", Style::default().fg(theme.header)),
        Span::styled("Title", Style::default().fg(theme.header)),
        Span::styled("State", Style::default().fg(theme.header)),
        Span::styled("Voting", Style::default().fg(theme.header)),
        Span::styled("For / Against / Abstain", Style::default().fg(theme.header)),
    ]);

    // One heading row per DAO followed by its proposals
    let mut rows: Vec<Row> = Vec::new();
    for dao in blocks {
        rows.push(Row::new(vec![
            Span::styled("", Style::default()),
            Span::styled(
                format!("{} · {}", dao.name, dao.chain_id),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
        ]));

        for enriched in &dao.proposals {
            let proposal = &enriched.proposal;
            let state = enriched.proposal_state;
            rows.push(Row::new(vec![
                Span::styled(proposal.proposal_number.to_string(), Style::default().fg(theme.text_dim)),
                Span::styled(
                    proposal.title.clone().unwrap_or_else(|| "Untitled".to_string()),
                    Style::default().fg(theme.text),
                ),
                Span::styled(state.label(), Style::default().fg(theme.proposal_state(state))),
                Span::styled(voting_window(enriched, now), Style::default().fg(theme.text_dim)),
                Span::styled(vote_tally(enriched), Style::default().fg(theme.text_dim)),
            ]));
        }
    }

    // Keep the selected row in view
    let visible = area.height.saturating_sub(3) as usize;
    let offset = if visible == 0 {
        0
    } else {
        app.proposal_scroll.saturating_sub(visible - 1)
    };

    let rows: Vec<Row> = rows
        .into_iter()
        .enumerate()
        .skip(offset)
        .map(|(i, row)| {
            if i == app.proposal_scroll && is_active {
                row.style(Style::default().bg(theme.bg_selected).fg(theme.text))
            } else {
                row
            }
        })
        .collect();

    let widths = vec![
        Constraint::Length(5),
        Constraint::Percentage(40),
        Constraint::Percentage(12),
        Constraint::Percentage(20),
        Constraint::Percentage(25),
    ];

    let table = Table::new(rows, widths).header(header).block(block);

    f.render_widget(table, area);
}

fn draw_empty_proposals<D, P>(f: &mut Frame, app: &App<D, P>, area: Rect) {
    let theme = &app.theme;
    let block = section_block(theme, " Proposals ", app.section == Section::Proposals);

    let empty = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            EMPTY_PROPOSALS_TITLE,
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(EMPTY_PROPOSALS_BODY, Style::default().fg(theme.text_dim))),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(block);

    f.render_widget(empty, area);
}

fn draw_footer<D, P>(f: &mut Frame, app: &App<D, P>, area: Rect) {
    let theme = &app.theme;
    let hints: Vec<(&str, &str)> = match app.view_state() {
        ViewState::Loaded(_) => vec![
            ("↑↓", "Nav"),
            ("Tab", "Next"),
            ("R", "Refresh"),
            ("c", "Connect"),
            ("x", "Disconnect"),
            ("h", "Help"),
            ("q", "Quit"),
        ],
        ViewState::Error => vec![("R", "Retry"), ("c", "Connect"), ("x", "Disconnect"), ("q", "Quit")],
        ViewState::Loading => vec![("x", "Disconnect"), ("h", "Help"), ("q", "Quit")],
        ViewState::Unconnected => vec![("c", "Connect"), ("h", "Help"), ("q", "Quit")],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else if area.width < 80 { 5 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(theme.accent)),
                Span::styled(format!(" {} │ ", action), Style::default().fg(theme.text_dim)),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);

    f.render_widget(footer, area);
}

fn draw_connect_popup<D, P>(f: &mut Frame, app: &App<D, P>) {
    let theme = &app.theme;
    let area = f.area();
    let popup_area = centered_rect(if area.width < 80 { 90 } else { 60 }, 20, area);

    f.render_widget(Clear, popup_area);

    let input = Paragraph::new(vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(" ", Style::default()),
            Span::styled(app.input_buffer.as_str(), Style::default().fg(theme.text)),
            Span::styled("_", Style::default().fg(theme.accent)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled(" Enter", Style::default().fg(theme.accent)),
            Span::styled(" connect  ", Style::default().fg(theme.text_dim)),
            Span::styled("Esc", Style::default().fg(theme.accent)),
            Span::styled(" cancel", Style::default().fg(theme.text_dim)),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Wallet Address ", Style::default().fg(theme.accent)))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent)),
    );

    f.render_widget(input, popup_area);
}

fn draw_help_popup(f: &mut Frame, theme: &Theme) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let heading = |text: &'static str| {
        Line::from(Span::styled(text, Style::default().fg(theme.header).add_modifier(Modifier::BOLD)))
    };
    let binding = |key: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(key, Style::default().fg(theme.accent)),
            Span::raw(action),
        ])
    };

    let help_text = vec![
        heading("═══ Navigation ═══"),
        binding("  Tab       ", "Switch between auctions and proposals"),
        binding("  ↑/↓ j/k   ", "Move up/down in lists"),
        Line::from(""),
        heading("═══ Dashboard ═══"),
        binding("  R         ", "Refresh (retry after an error)"),
        binding("  c         ", "Connect a wallet address"),
        binding("  x         ", "Disconnect"),
        Line::from(""),
        heading("═══ Proposals ═══"),
        Line::from(Span::raw("  Only active, pending and queued proposals are listed")),
        Line::from(""),
        heading("═══ Command Line ═══"),
        binding("  daoboard --address 0x…  ", "Open for an address"),
        binding("  daoboard --json         ", "Print the dashboard as JSON"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(theme.text_dim)),
            Span::styled("h", Style::default().fg(theme.accent)),
            Span::styled("/", Style::default().fg(theme.text_dim)),
            Span::styled("?", Style::default().fg(theme.accent)),
            Span::styled("/", Style::default().fg(theme.text_dim)),
            Span::styled("Esc", Style::default().fg(theme.accent)),
            Span::styled(" to close", Style::default().fg(theme.text_dim)),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 daoboard Help ", Style::default().fg(theme.accent)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.accent)),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
