use iced::{Background, Border, Color, Theme, Vector};

#[derive(Debug, Clone, Copy)]
pub(crate) struct TabStyle {
    pub(crate) active: bool,
}

impl iced::widget::button::StyleSheet for TabStyle {
    type Style = Theme;

    fn active(&self, style: &Self::Style) -> iced::widget::button::Appearance {
        let palette = style.extended_palette();
        let (background, text_color) = if self.active {
            (palette.background.base.color, palette.background.base.text)
        } else {
            (palette.background.weak.color, palette.background.weak.text)
        };

        iced::widget::button::Appearance {
            background: Some(Background::Color(background)),
            text_color,
            border: Border {
                color: palette.background.strong.color,
                width: 1.0,
                radius: [8.0, 8.0, 0.0, 0.0].into(),
            },
            shadow_offset: if self.active {
                Vector::new(0.0, 0.0)
            } else {
                Vector::new(0.0, 1.0)
            },
            ..iced::widget::button::Appearance::default()
        }
    }

    fn hovered(&self, style: &Self::Style) -> iced::widget::button::Appearance {
        let mut appearance = self.active(style);
        if !self.active {
            if let Some(Background::Color(color)) = appearance.background {
                appearance.background = Some(Background::Color(lift(color)));
            }
        }
        appearance
    }
}

/// Flat button wrapping a whole file or job card.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CardButtonStyle;

impl iced::widget::button::StyleSheet for CardButtonStyle {
    type Style = Theme;

    fn active(&self, style: &Self::Style) -> iced::widget::button::Appearance {
        let palette = style.extended_palette();
        iced::widget::button::Appearance {
            background: Some(Background::Color(palette.background.weak.color)),
            text_color: palette.background.weak.text,
            border: Border {
                color: palette.background.strong.color,
                width: 1.0,
                radius: 6.0.into(),
            },
            ..iced::widget::button::Appearance::default()
        }
    }

    fn hovered(&self, style: &Self::Style) -> iced::widget::button::Appearance {
        let mut appearance = self.active(style);
        if let Some(Background::Color(color)) = appearance.background {
            appearance.background = Some(Background::Color(lift(color)));
        }
        appearance
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ToolRowStyle {
    pub(crate) active: bool,
}

impl iced::widget::container::StyleSheet for ToolRowStyle {
    type Style = Theme;

    fn appearance(&self, style: &Self::Style) -> iced::widget::container::Appearance {
        let palette = style.extended_palette();
        let (background, text_color) = if self.active {
            (Some(Background::Color(palette.primary.weak.color)), Some(palette.primary.weak.text))
        } else {
            (None, None)
        };

        iced::widget::container::Appearance {
            text_color,
            background,
            border: Border {
                color: Color::TRANSPARENT,
                width: 0.0,
                radius: 4.0.into(),
            },
            ..iced::widget::container::Appearance::default()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ToastStyle {
    pub(crate) accent: Color,
}

impl iced::widget::container::StyleSheet for ToastStyle {
    type Style = Theme;

    fn appearance(&self, style: &Self::Style) -> iced::widget::container::Appearance {
        let palette = style.extended_palette();
        iced::widget::container::Appearance {
            text_color: Some(palette.background.base.text),
            background: Some(Background::Color(palette.background.base.color)),
            border: Border {
                color: self.accent,
                width: 2.0,
                radius: 6.0.into(),
            },
            ..iced::widget::container::Appearance::default()
        }
    }
}

fn lift(color: Color) -> Color {
    Color {
        r: (color.r + 0.05).min(1.0),
        g: (color.g + 0.05).min(1.0),
        b: (color.b + 0.05).min(1.0),
        a: color.a,
    }
}
