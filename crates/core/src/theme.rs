use flamecanvas_protocol::{Rgba, Theme, ThemeToken};

pub fn resolve(token: ThemeToken, theme: Theme) -> Rgba {
    match theme {
        Theme::Dark => resolve_dark(token),
        Theme::Light => resolve_light(token),
    }
}

fn resolve_dark(token: ThemeToken) -> Rgba {
    // Catppuccin Mocha
    use ThemeToken::*;
    match token {
        Background => Rgba::rgb(0x1e, 0x1e, 0x2e),  // Base
        FrameBorder => Rgba::rgb(0x11, 0x11, 0x1b), // Crust
        FrameText => Rgba::rgb(0x11, 0x11, 0x1b),
        HoverOutline => Rgba::rgb(0xcd, 0xd6, 0xf4), // Text

        DiffNeutral => Rgba::rgb(0x58, 0x5b, 0x70), // Surface2
        DiffGrew => Rgba::rgb(0xf3, 0x8b, 0xa8),    // Red
        DiffShrank => Rgba::rgb(0x89, 0xb4, 0xfa),  // Blue
    }
}

fn resolve_light(token: ThemeToken) -> Rgba {
    use ThemeToken::*;
    match token {
        Background => Rgba::rgb(255, 255, 255),
        FrameBorder => Rgba::rgb(255, 255, 255),
        FrameText => Rgba::rgb(20, 20, 30),
        HoverOutline => Rgba::rgb(20, 20, 30),

        DiffNeutral => Rgba::rgb(220, 220, 225),
        DiffGrew => Rgba::rgb(220, 60, 20),
        DiffShrank => Rgba::rgb(40, 120, 200),
    }
}
